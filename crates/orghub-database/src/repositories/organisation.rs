//! Organisation collection and persistence operations.

use std::collections::HashMap;

use sqlx::PgConnection;
use tracing::error;
use uuid::Uuid;

use orghub_core::roles::Role;
use orghub_core::traits::Persistable;
use orghub_core::types::actor::Actor;
use orghub_core::types::criteria::Criteria;
use orghub_core::types::filter::{FilterRegistry, FilterSet, standard_filters};
use orghub_core::types::pagination::{PageLinks, PageRequest};
use orghub_core::types::query::{Constructed, EntityQuery};
use orghub_core::types::sorting::SortField;
use orghub_core::types::value::{Params, SqlValue};
use orghub_core::{AppError, AppResult};
use orghub_entity::organisation::Organisation;

use crate::search::{SearchTarget, TargetPermission};
use crate::store;

/// Save an organisation, enforcing optimistic concurrency.
pub async fn save(
    conn: &mut PgConnection,
    organisation: &mut Organisation,
    actor: &Actor,
) -> AppResult<()> {
    store::save(conn, organisation, actor).await
}

/// Find an organisation by primary key.
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Organisation>> {
    store::find_by_id(conn, id).await
}

/// Find an organisation by an arbitrary column.
pub async fn find_by_column(
    conn: &mut PgConnection,
    column: &str,
    value: SqlValue,
) -> AppResult<Option<Organisation>> {
    store::find_by_column(conn, column, value).await
}

/// An ordered page of organisations plus the criteria that produced it.
#[derive(Debug)]
pub struct Organisations {
    /// The page rows, ordered by name.
    pub data: Vec<Organisation>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
    /// Total rows matching the criteria across all pages.
    pub total: u64,
}

impl Organisations {
    /// The filters a UI may toggle on organisation listings.
    pub fn available_filters() -> FilterRegistry {
        FilterRegistry::from_filters(standard_filters(Organisation::TABLE))
    }

    /// How organisations participate in federated search.
    pub fn search_target() -> SearchTarget {
        SearchTarget {
            entity_type: "Organisation",
            label_sql: "organisations.name",
            table: Organisation::TABLE,
            path: "organisations",
            join_sql: "",
            org_column: "organisations.id",
            permission: TargetPermission::Role(Role::Admin),
        }
    }

    /// Fetch the page of organisations selected by `criteria`.
    ///
    /// Supported queries: all rows, by set of ids, and organisations
    /// containing a given member.
    pub async fn find_all(conn: &mut PgConnection, criteria: Criteria) -> AppResult<Self> {
        let built = match &criteria.query {
            EntityQuery::All | EntityQuery::ByIds(_) => {
                let columns = Organisation::select_columns();
                criteria.query.construct(
                    &columns,
                    Organisation::TABLE,
                    &criteria.filters,
                    &criteria.pagination,
                    &SortField::asc("name"),
                )?
            }
            EntityQuery::ContainingUser(user_id) => {
                build_containing_user_sql(*user_id, &criteria.filters, &criteria.pagination)
            }
            other => {
                error!(
                    model = Organisation::TABLE,
                    query = other.name(),
                    "unsupported query variant"
                );
                return Err(AppError::invalid_query(format!(
                    "organisations cannot execute {} queries",
                    other.name()
                )));
            }
        };

        let (data, total) =
            store::fetch_page::<Organisation>(conn, Organisation::TABLE, &built).await?;
        Ok(Self {
            data,
            criteria,
            total,
        })
    }

    /// Index this page by organisation id.
    pub fn by_id(&self) -> HashMap<Uuid, &Organisation> {
        self.data.iter().map(|org| (org.id, org)).collect()
    }

    /// Page-link descriptors for the window this page covers.
    pub fn links(&self) -> PageLinks {
        self.criteria.pagination.links(self.total)
    }
}

/// The membership-join statement behind
/// [`EntityQuery::ContainingUser`].
fn build_containing_user_sql(
    user_id: Uuid,
    filters: &FilterSet,
    pagination: &PageRequest,
) -> Constructed {
    let mut params = Params::new();
    let user_param = params.push(SqlValue::Uuid(user_id));

    let predicate = format!("memberships.user_id = {user_param}");
    let where_clause = match filters.clause(&mut params) {
        Some(clause) => format!("{predicate} AND {clause}"),
        None => predicate,
    };

    let columns = Organisation::select_columns()
        .iter()
        .map(|col| format!("organisations.{col}"))
        .collect::<Vec<_>>()
        .join(", ");
    let from = "FROM organisations \
                JOIN memberships ON memberships.organisation_id = organisations.id";

    Constructed {
        select_sql: format!(
            "SELECT {columns} {from} WHERE {where_clause} \
             ORDER BY organisations.name ASC, organisations.id ASC{}",
            pagination.sql_clause()
        ),
        count_sql: format!("SELECT COUNT(*) {from} WHERE {where_clause}"),
        params: params.into_values(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orghub_core::types::filter::FilterNode;

    #[test]
    fn test_containing_user_joins_memberships() {
        let user = Uuid::new_v4();
        let built =
            build_containing_user_sql(user, &FilterSet::default(), &PageRequest::default());
        assert!(
            built
                .select_sql
                .contains("JOIN memberships ON memberships.organisation_id = organisations.id")
        );
        assert!(built.select_sql.contains("WHERE memberships.user_id = $1"));
        assert!(
            built
                .select_sql
                .contains("ORDER BY organisations.name ASC, organisations.id ASC")
        );
        assert_eq!(built.params, vec![SqlValue::Uuid(user)]);
    }

    #[test]
    fn test_containing_user_composes_filters() {
        let mut filters = FilterSet::default();
        for filter in standard_filters(Organisation::TABLE).into_iter().take(1) {
            filters.push(FilterNode::Filter(filter));
        }
        let built = build_containing_user_sql(
            Uuid::new_v4(),
            &filters,
            &PageRequest::default(),
        );
        assert!(
            built
                .select_sql
                .contains("memberships.user_id = $1 AND age(organisations.updated_at) < $2::interval")
        );
        assert_eq!(built.params.len(), 2);
    }
}
