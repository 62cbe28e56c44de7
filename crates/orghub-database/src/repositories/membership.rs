//! Organisation membership collection and persistence operations.
//!
//! Membership rows always hydrate with the member's email joined from
//! the users table, so lookups here use membership-specific statements
//! instead of the generic single-table find.

use sqlx::PgConnection;
use tracing::error;
use uuid::Uuid;

use orghub_core::traits::Persistable;
use orghub_core::types::actor::Actor;
use orghub_core::types::criteria::Criteria;
use orghub_core::types::filter::{FilterRegistry, standard_filters};
use orghub_core::types::pagination::PageLinks;
use orghub_core::types::query::{Constructed, EntityQuery};
use orghub_core::types::value::{Params, SqlValue};
use orghub_core::{AppError, AppResult};
use orghub_entity::membership::Membership;

use crate::store;

const MEMBERSHIP_COLUMNS: &str = "memberships.id, memberships.revision, \
    memberships.created_at, memberships.updated_at, memberships.user_id, \
    memberships.organisation_id, memberships.roles, users.email";

const MEMBERSHIP_FROM: &str =
    "FROM memberships INNER JOIN users ON memberships.user_id = users.id";

/// Save a membership, enforcing optimistic concurrency.
pub async fn save(
    conn: &mut PgConnection,
    membership: &mut Membership,
    actor: &Actor,
) -> AppResult<()> {
    store::save(conn, membership, actor).await
}

/// Remove a membership, guarded by its revision; the audit record is
/// written in the same statement.
pub async fn delete(
    conn: &mut PgConnection,
    membership: &Membership,
    actor: &Actor,
) -> AppResult<()> {
    store::delete(conn, membership, actor).await
}

/// Find a membership by primary key, email included.
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Membership>> {
    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} {MEMBERSHIP_FROM} WHERE memberships.id = $1");
    sqlx::query_as::<_, Membership>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| store::map_db_error(Membership::TABLE, e))
}

/// An ordered page of memberships plus the criteria that produced it.
#[derive(Debug)]
pub struct Memberships {
    /// The page rows, ordered by member email.
    pub data: Vec<Membership>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
    /// Total rows matching the criteria across all pages.
    pub total: u64,
}

impl Memberships {
    /// The filters a UI may toggle on membership listings.
    pub fn available_filters() -> FilterRegistry {
        FilterRegistry::from_filters(standard_filters(Membership::TABLE))
    }

    /// Fetch the page of memberships selected by `criteria`.
    ///
    /// Supported queries: all rows, by user, by organisation.
    pub async fn find_all(conn: &mut PgConnection, criteria: Criteria) -> AppResult<Self> {
        let built = build_find_all_sql(&criteria)?;
        let (data, total) =
            store::fetch_page::<Membership>(conn, Membership::TABLE, &built).await?;
        Ok(Self {
            data,
            criteria,
            total,
        })
    }

    /// Page-link descriptors for the window this page covers.
    pub fn links(&self) -> PageLinks {
        self.criteria.pagination.links(self.total)
    }
}

fn build_find_all_sql(criteria: &Criteria) -> AppResult<Constructed> {
    let mut params = Params::new();

    let predicate = match &criteria.query {
        EntityQuery::All => "true".to_string(),
        EntityQuery::ByUser(id) => {
            let p = params.push(SqlValue::Uuid(*id));
            format!("memberships.user_id = {p}")
        }
        EntityQuery::ByOrganisation(id) => {
            let p = params.push(SqlValue::Uuid(*id));
            format!("memberships.organisation_id = {p}")
        }
        other => {
            error!(
                model = Membership::TABLE,
                query = other.name(),
                "unsupported query variant"
            );
            return Err(AppError::invalid_query(format!(
                "memberships cannot execute {} queries",
                other.name()
            )));
        }
    };

    let where_clause = match criteria.filters.clause(&mut params) {
        Some(clause) => format!("{predicate} AND {clause}"),
        None => predicate,
    };

    Ok(Constructed {
        select_sql: format!(
            "SELECT {MEMBERSHIP_COLUMNS} {MEMBERSHIP_FROM} WHERE {where_clause} \
             ORDER BY users.email ASC, memberships.id ASC{}",
            criteria.pagination.sql_clause()
        ),
        count_sql: format!("SELECT COUNT(*) {MEMBERSHIP_FROM} WHERE {where_clause}"),
        params: params.into_values(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orghub_core::error::ErrorKind;

    #[test]
    fn test_by_organisation_scopes_to_tenant() {
        let org = Uuid::new_v4();
        let built = build_find_all_sql(&Criteria::new(EntityQuery::ByOrganisation(org)))
            .expect("construct");
        assert!(
            built
                .select_sql
                .contains("WHERE memberships.organisation_id = $1")
        );
        assert!(built.select_sql.contains("INNER JOIN users"));
        assert_eq!(built.params, vec![SqlValue::Uuid(org)]);
    }

    #[test]
    fn test_by_user_scopes_to_member() {
        let user = Uuid::new_v4();
        let built =
            build_find_all_sql(&Criteria::new(EntityQuery::ByUser(user))).expect("construct");
        assert!(built.select_sql.contains("WHERE memberships.user_id = $1"));
    }

    #[test]
    fn test_unsupported_query_is_invalid() {
        let err = build_find_all_sql(&Criteria::new(EntityQuery::ByEntity(Uuid::new_v4())))
            .expect_err("must reject");
        assert_eq!(err.kind, ErrorKind::InvalidQuery);
    }
}
