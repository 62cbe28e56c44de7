//! Generic resource ("thing") collection and persistence operations.

use std::collections::HashMap;

use sqlx::PgConnection;
use tracing::error;
use uuid::Uuid;

use orghub_core::roles::Role;
use orghub_core::traits::Persistable;
use orghub_core::types::actor::Actor;
use orghub_core::types::criteria::Criteria;
use orghub_core::types::filter::{FilterRegistry, standard_filters};
use orghub_core::types::pagination::PageLinks;
use orghub_core::types::query::EntityQuery;
use orghub_core::types::sorting::SortField;
use orghub_core::types::value::SqlValue;
use orghub_core::{AppError, AppResult};
use orghub_entity::thing::Thing;

use crate::search::{SearchTarget, TargetPermission};
use crate::store;

/// Save a thing, enforcing optimistic concurrency.
pub async fn save(conn: &mut PgConnection, thing: &mut Thing, actor: &Actor) -> AppResult<()> {
    store::save(conn, thing, actor).await
}

/// Find a thing by primary key.
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Thing>> {
    store::find_by_id(conn, id).await
}

/// Find a thing by an arbitrary column.
pub async fn find_by_column(
    conn: &mut PgConnection,
    column: &str,
    value: SqlValue,
) -> AppResult<Option<Thing>> {
    store::find_by_column(conn, column, value).await
}

/// An ordered page of things plus the criteria that produced it.
#[derive(Debug)]
pub struct Things {
    /// The page rows, ordered by name.
    pub data: Vec<Thing>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
    /// Total rows matching the criteria across all pages.
    pub total: u64,
}

impl Things {
    /// The filters a UI may toggle on thing listings.
    pub fn available_filters() -> FilterRegistry {
        FilterRegistry::from_filters(standard_filters(Thing::TABLE))
    }

    /// How things participate in federated search.
    pub fn search_target() -> SearchTarget {
        SearchTarget {
            entity_type: "Thing",
            label_sql: "things.name || ' - ' || things.description",
            table: Thing::TABLE,
            path: "things",
            join_sql: "",
            org_column: "things.organisation_id",
            permission: TargetPermission::Role(Role::Admin),
        }
    }

    /// Fetch the page of things selected by `criteria`.
    ///
    /// Supported queries: all rows, by organisation, by set of ids, by
    /// phrase.
    pub async fn find_all(conn: &mut PgConnection, criteria: Criteria) -> AppResult<Self> {
        match &criteria.query {
            EntityQuery::All
            | EntityQuery::ByOrganisation(_)
            | EntityQuery::ByIds(_)
            | EntityQuery::ByPhrase { .. } => {}
            other => {
                error!(model = Thing::TABLE, query = other.name(), "unsupported query variant");
                return Err(AppError::invalid_query(format!(
                    "things cannot execute {} queries",
                    other.name()
                )));
            }
        }

        let columns = Thing::select_columns();
        let built = criteria.query.construct(
            &columns,
            Thing::TABLE,
            &criteria.filters,
            &criteria.pagination,
            &SortField::asc("name"),
        )?;
        let (data, total) = store::fetch_page::<Thing>(conn, Thing::TABLE, &built).await?;
        Ok(Self {
            data,
            criteria,
            total,
        })
    }

    /// Index this page by thing id.
    pub fn by_id(&self) -> HashMap<Uuid, &Thing> {
        self.data.iter().map(|thing| (thing.id, thing)).collect()
    }

    /// Page-link descriptors for the window this page covers.
    pub fn links(&self) -> PageLinks {
        self.criteria.pagination.links(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_target_requires_admin() {
        let target = Things::search_target();
        assert_eq!(target.permission, TargetPermission::Role(Role::Admin));
        assert_eq!(target.org_column, "things.organisation_id");
    }

    #[test]
    fn test_available_filters_cover_standards() {
        let registry = Things::available_filters();
        assert!(registry.get("updated-within-fortnight").is_some());
        assert!(registry.get("created-within-24hrs").is_some());
    }
}
