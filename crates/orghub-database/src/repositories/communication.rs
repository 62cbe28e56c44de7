//! Communication log collection and persistence operations.

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
use orghub_core::{AppError, AppResult};
use orghub_entity::communication::Communication;
use orghub_entity::user::User;

use crate::search::{SearchTarget, TargetPermission};
use crate::store;

/// Save a communication record, enforcing optimistic concurrency.
pub async fn save(
    conn: &mut PgConnection,
    communication: &mut Communication,
    actor: &Actor,
) -> AppResult<()> {
    store::save(conn, communication, actor).await
}

/// Find a communication by primary key.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: Uuid,
) -> AppResult<Option<Communication>> {
    store::find_by_id(conn, id).await
}

/// Record a communication sent to a known user. Called after delivery
/// is handed off, never inside the delivery path.
pub async fn log_user_communication(
    conn: &mut PgConnection,
    organisation_id: Uuid,
    user: &User,
    channel: &str,
    subject: &str,
    actor: &Actor,
) -> AppResult<Communication> {
    let mut communication =
        Communication::new(organisation_id, channel, subject).with_user(user.id);
    store::save(conn, &mut communication, actor).await?;
    Ok(communication)
}

/// An ordered page of communications plus the criteria that produced it.
#[derive(Debug)]
pub struct Communications {
    /// The page rows, newest first.
    pub data: Vec<Communication>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
    /// Total rows matching the criteria across all pages.
    pub total: u64,
}

impl Communications {
    /// The filters a UI may toggle on communication listings.
    pub fn available_filters() -> FilterRegistry {
        FilterRegistry::from_filters(standard_filters(Communication::TABLE))
    }

    /// How communications participate in federated search.
    pub fn search_target() -> SearchTarget {
        SearchTarget {
            entity_type: "Communication",
            label_sql: "communications.subject",
            table: Communication::TABLE,
            path: "communications",
            join_sql: "",
            org_column: "communications.organisation_id",
            permission: TargetPermission::Role(Role::Admin),
        }
    }

    /// Fetch the page of communications selected by `criteria`.
    ///
    /// Supported queries: all rows, by organisation, by recipient user.
    pub async fn find_all(conn: &mut PgConnection, criteria: Criteria) -> AppResult<Self> {
        match &criteria.query {
            EntityQuery::All | EntityQuery::ByOrganisation(_) | EntityQuery::ByUser(_) => {}
            other => {
                error!(
                    model = Communication::TABLE,
                    query = other.name(),
                    "unsupported query variant"
                );
                return Err(AppError::invalid_query(format!(
                    "communications cannot execute {} queries",
                    other.name()
                )));
            }
        }

        let columns = Communication::select_columns();
        let built = criteria.query.construct(
            &columns,
            Communication::TABLE,
            &criteria.filters,
            &criteria.pagination,
            &SortField::desc("created_at"),
        )?;
        let (data, total) =
            store::fetch_page::<Communication>(conn, Communication::TABLE, &built).await?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_target_requires_admin() {
        let target = Communications::search_target();
        assert_eq!(target.permission, TargetPermission::Role(Role::Admin));
    }
}
