//! Federated, permission-gated phrase search.
//!
//! Each entity type that participates in search registers a
//! [`SearchTarget`] into a [`SearchRegistry`], built once at startup and
//! shared read-only. A search fans out as one `UNION ALL` statement over
//! the targets the caller is permitted to see; a caller lacking a
//! target's permission never receives rows for that entity type,
//! whatever the phrase matches.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use tracing::error;
use uuid::Uuid;

use orghub_core::roles::{Role, RoleSet};
use orghub_core::types::criteria::Criteria;
use orghub_core::types::pagination::PageRequest;
use orghub_core::types::query::EntityQuery;
use orghub_core::{AppError, AppResult};

use crate::repositories::{Communications, Organisations, Things, Users};
use crate::store;

/// Who is searching: instance-wide admin flag plus the roles held in
/// the organisation being searched.
#[derive(Debug, Clone, Default)]
pub struct SearchCaller {
    /// Whether the caller is an instance-wide super admin.
    pub super_admin: bool,
    /// Roles held in the searched organisation.
    pub roles: RoleSet,
}

/// What a [`SearchTarget`] requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPermission {
    /// The caller must hold (or imply) this organisation role.
    Role(Role),
    /// Only instance-wide super admins may search this target.
    SuperAdminOnly,
}

/// How one entity type participates in federated search.
///
/// Registered at process start; immutable thereafter.
#[derive(Debug, Clone)]
pub struct SearchTarget {
    /// Entity type name surfaced on each result row.
    pub entity_type: &'static str,
    /// SQL expression producing the result label.
    pub label_sql: &'static str,
    /// The entity table.
    pub table: &'static str,
    /// UI path fragment for linking to the entity.
    pub path: &'static str,
    /// Extra join clause (leading space included), empty for most targets.
    pub join_sql: &'static str,
    /// The column scoping rows to the searched organisation.
    pub org_column: &'static str,
    /// The access check gating this target.
    pub permission: TargetPermission,
}

impl SearchTarget {
    /// Whether the caller may receive rows from this target.
    pub fn permitted(&self, caller: &SearchCaller) -> bool {
        if caller.super_admin {
            return true;
        }
        match self.permission {
            TargetPermission::Role(role) => caller.roles.can(role),
            TargetPermission::SuperAdminOnly => false,
        }
    }

    /// One `UNION ALL` arm: `$1` is the organisation, `$2` the phrase.
    fn arm_sql(&self) -> String {
        let table = self.table;
        format!(
            "SELECT text '{entity_type}' AS entity_type, text '{path}' AS uri_path, \
             {table}.id AS id, {label} AS label, ts_rank_cd({table}.ts, query) AS rank \
             FROM {table}{join}, plainto_tsquery('english', $2) query \
             WHERE {org_column} = $1 AND query @@ {table}.ts",
            entity_type = self.entity_type,
            path = self.path,
            label = self.label_sql,
            join = self.join_sql,
            org_column = self.org_column,
        )
    }
}

/// The search targets registered for this process.
#[derive(Debug, Clone, Default)]
pub struct SearchRegistry {
    targets: Vec<SearchTarget>,
}

impl SearchRegistry {
    /// Build a registry from an explicit target list.
    pub fn new(targets: Vec<SearchTarget>) -> Self {
        Self { targets }
    }

    /// The registry covering every searchable entity type, in result
    /// precedence order.
    pub fn standard() -> Self {
        Self::new(vec![
            Organisations::search_target(),
            Users::search_target(),
            Things::search_target(),
            Communications::search_target(),
        ])
    }

    /// Narrow to the given entity types, preserving registration order.
    /// Used to let a UI scope search to one entity kind.
    pub fn narrow(&self, entity_types: &[&str]) -> Self {
        Self {
            targets: self
                .targets
                .iter()
                .filter(|target| entity_types.contains(&target.entity_type))
                .cloned()
                .collect(),
        }
    }

    /// The registered targets.
    pub fn targets(&self) -> &[SearchTarget] {
        &self.targets
    }
}

/// One federated search hit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SearchResult {
    /// Entity type of the matched row.
    pub entity_type: String,
    /// UI path fragment for linking to the entity.
    #[sqlx(rename = "uri_path")]
    pub path: String,
    /// Matched entity id.
    pub id: Uuid,
    /// Human-readable label.
    pub label: String,
    /// Full-text match rank.
    pub rank: f32,
}

/// An ordered page of search hits plus the criteria that produced it.
#[derive(Debug)]
pub struct SearchResults {
    /// The hits, by descending rank then id.
    pub data: Vec<SearchResult>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
}

impl SearchResults {
    /// Execute a phrase search over every permitted target.
    ///
    /// Requires a [`EntityQuery::ByPhrase`] criteria query; anything else
    /// is a caller error.
    pub async fn find_all(
        conn: &mut PgConnection,
        caller: &SearchCaller,
        criteria: Criteria,
        registry: &SearchRegistry,
    ) -> AppResult<Self> {
        let EntityQuery::ByPhrase {
            organisation_id,
            phrase,
        } = criteria.query.clone()
        else {
            error!(query = criteria.query.name(), "search requires a by-phrase query");
            return Err(AppError::invalid_query(format!(
                "search cannot execute {} queries",
                criteria.query.name()
            )));
        };

        let Some(sql) = build_search_sql(registry, caller, &criteria.pagination) else {
            return Ok(Self {
                data: Vec::new(),
                criteria,
            });
        };

        let data = sqlx::query_as::<_, SearchResult>(&sql)
            .bind(organisation_id)
            .bind(phrase)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| store::map_db_error("search", e))?;

        Ok(Self { data, criteria })
    }
}

/// Assemble the federated statement, or `None` when no target survives
/// the permission check (no SQL runs at all in that case).
pub(crate) fn build_search_sql(
    registry: &SearchRegistry,
    caller: &SearchCaller,
    pagination: &PageRequest,
) -> Option<String> {
    let arms: Vec<String> = registry
        .targets()
        .iter()
        .filter(|target| target.permitted(caller))
        .map(SearchTarget::arm_sql)
        .collect();

    if arms.is_empty() {
        return None;
    }

    Some(format!(
        "{} ORDER BY rank DESC, id ASC{}",
        arms.join(" UNION ALL "),
        pagination.sql_clause()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_caller() -> SearchCaller {
        SearchCaller {
            super_admin: false,
            roles: [Role::Admin].into_iter().collect(),
        }
    }

    #[test]
    fn test_denied_target_contributes_no_sql() {
        let registry = SearchRegistry::standard();
        let sql = build_search_sql(&registry, &admin_caller(), &PageRequest::default())
            .expect("admin sees some targets");
        // Users are super-admin-only; an org admin must not query them.
        assert!(!sql.contains("FROM users"));
        assert!(sql.contains("FROM things"));
        assert!(sql.contains("FROM organisations"));
    }

    #[test]
    fn test_super_admin_sees_every_target() {
        let registry = SearchRegistry::standard();
        let caller = SearchCaller {
            super_admin: true,
            roles: RoleSet::new(),
        };
        let sql = build_search_sql(&registry, &caller, &PageRequest::default()).expect("sql");
        assert!(sql.contains("FROM users"));
        assert_eq!(sql.matches(" UNION ALL ").count(), registry.targets().len() - 1);
    }

    #[test]
    fn test_no_permitted_target_means_no_statement() {
        let registry = SearchRegistry::standard();
        let caller = SearchCaller::default();
        assert!(build_search_sql(&registry, &caller, &PageRequest::default()).is_none());
    }

    #[test]
    fn test_teamlead_implication_does_not_reach_admin_targets() {
        let registry = SearchRegistry::standard();
        let caller = SearchCaller {
            super_admin: false,
            roles: [Role::TeamLead].into_iter().collect(),
        };
        // Every standard target requires at least admin.
        assert!(build_search_sql(&registry, &caller, &PageRequest::default()).is_none());
    }

    #[test]
    fn test_narrow_scopes_to_one_entity_type() {
        let registry = SearchRegistry::standard().narrow(&["Thing"]);
        let sql = build_search_sql(&registry, &admin_caller(), &PageRequest::default())
            .expect("things remain");
        assert!(sql.contains("FROM things"));
        assert!(!sql.contains(" UNION ALL "));
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let registry = SearchRegistry::standard();
        let sql = build_search_sql(&registry, &admin_caller(), &PageRequest::default())
            .expect("sql");
        assert!(sql.contains("ORDER BY rank DESC, id ASC"));
        assert!(sql.ends_with("LIMIT 25 OFFSET 0"));
    }
}
