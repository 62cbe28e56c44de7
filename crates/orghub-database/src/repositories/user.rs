//! User collection and persistence operations.

use std::collections::HashMap;

use sqlx::PgConnection;
use tracing::error;
use uuid::Uuid;

use orghub_core::traits::Persistable;
use orghub_core::types::actor::Actor;
use orghub_core::types::criteria::Criteria;
use orghub_core::types::filter::{Filter, FilterKind, FilterRegistry, standard_filters};
use orghub_core::types::pagination::PageLinks;
use orghub_core::types::query::EntityQuery;
use orghub_core::types::sorting::SortField;
use orghub_core::types::value::SqlValue;
use orghub_core::{AppError, AppResult};
use orghub_entity::user::User;

use crate::search::{SearchTarget, TargetPermission};
use crate::store;

/// Save a user, enforcing optimistic concurrency; the audit record is
/// written in the same statement.
pub async fn save(conn: &mut PgConnection, user: &mut User, actor: &Actor) -> AppResult<()> {
    store::save(conn, user, actor).await
}

/// Find a user by primary key.
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<User>> {
    store::find_by_id(conn, id).await
}

/// Find a user by email. Emails are stored lowercased, so the lookup
/// lowercases its input.
pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> AppResult<Option<User>> {
    store::find_by_column(conn, "email", SqlValue::Text(email.to_lowercase())).await
}

/// An ordered page of users plus the criteria that produced it.
#[derive(Debug)]
pub struct Users {
    /// The page rows, ordered by email.
    pub data: Vec<User>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
    /// Total rows matching the criteria across all pages.
    pub total: u64,
}

impl Users {
    /// The filters a UI may toggle on user listings.
    pub fn available_filters() -> FilterRegistry {
        FilterRegistry::from_filters(standard_filters(User::TABLE)).with(vec![
            Filter::new(
                "user-has-been-invited",
                "Has Been Invited",
                User::TABLE,
                FilterKind::HasProp {
                    column: "verification_email_sent".to_string(),
                    value: "true".to_string(),
                },
            ),
            Filter::new(
                "user-is-verified",
                "Has Accepted Invite",
                User::TABLE,
                FilterKind::HasProp {
                    column: "verified".to_string(),
                    value: "true".to_string(),
                },
            ),
        ])
    }

    /// How users participate in federated search. Accounts span
    /// organisations, so only super admins may search them.
    pub fn search_target() -> SearchTarget {
        SearchTarget {
            entity_type: "User",
            label_sql: "users.email",
            table: User::TABLE,
            path: "users",
            join_sql: " JOIN memberships ON memberships.user_id = users.id",
            org_column: "memberships.organisation_id",
            permission: TargetPermission::SuperAdminOnly,
        }
    }

    /// Fetch the page of users selected by `criteria`.
    ///
    /// Supported queries: all rows, by set of ids.
    pub async fn find_all(conn: &mut PgConnection, criteria: Criteria) -> AppResult<Self> {
        match &criteria.query {
            EntityQuery::All | EntityQuery::ByIds(_) => {}
            other => {
                error!(model = User::TABLE, query = other.name(), "unsupported query variant");
                return Err(AppError::invalid_query(format!(
                    "users cannot execute {} queries",
                    other.name()
                )));
            }
        }

        let columns = User::select_columns();
        let built = criteria.query.construct(
            &columns,
            User::TABLE,
            &criteria.filters,
            &criteria.pagination,
            &SortField::asc("email"),
        )?;
        let (data, total) = store::fetch_page::<User>(conn, User::TABLE, &built).await?;
        Ok(Self {
            data,
            criteria,
            total,
        })
    }

    /// Index this page by user id.
    pub fn by_id(&self) -> HashMap<Uuid, &User> {
        self.data.iter().map(|user| (user.id, user)).collect()
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
    fn test_available_filters_are_addressable() {
        let registry = Users::available_filters();
        assert!(registry.get("user-is-verified").is_some());
        assert!(registry.get("user-has-been-invited").is_some());
        assert!(registry.get("created-within-fortnight").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_search_target_is_super_admin_only() {
        let target = Users::search_target();
        assert_eq!(target.permission, TargetPermission::SuperAdminOnly);
        assert_eq!(target.table, "users");
    }
}
