//! Organisation membership entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use uuid::Uuid;

use orghub_core::roles::RoleSet;
use orghub_core::traits::Persistable;
use orghub_core::types::revision::Revision;
use orghub_core::types::value::SqlValue;

/// Links a user to an organisation with a set of granted roles.
///
/// Hydrated rows carry the member's email, joined from the users table;
/// the email is never persisted on the membership row itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    /// Unique membership identifier.
    pub id: Uuid,
    /// Optimistic-concurrency token.
    pub revision: Revision,
    /// When the membership was created.
    pub created_at: DateTime<Utc>,
    /// When the membership was last saved.
    pub updated_at: DateTime<Utc>,
    /// The member.
    pub user_id: Uuid,
    /// The organisation joined.
    pub organisation_id: Uuid,
    /// Roles granted within the organisation.
    #[sqlx(json)]
    pub roles: RoleSet,
    /// The member's email, joined at query time.
    pub email: String,
}

impl Membership {
    /// Create a new membership granting `roles`.
    pub fn new(user_id: Uuid, organisation_id: Uuid, roles: RoleSet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            revision: Revision::unsaved(),
            created_at: now,
            updated_at: now,
            user_id,
            organisation_id,
            roles,
            email: String::new(),
        }
    }
}

impl Persistable for Membership {
    const TABLE: &'static str = "memberships";
    const COLUMNS: &'static [&'static str] = &["user_id", "organisation_id", "roles"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn revision(&self) -> &Revision {
        &self.revision
    }

    fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }

    fn organisation_id(&self) -> Option<Uuid> {
        Some(self.organisation_id)
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Uuid(self.user_id),
            SqlValue::Uuid(self.organisation_id),
            SqlValue::Json(serde_json::to_value(&self.roles).unwrap_or_else(|_| json!({}))),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orghub_core::roles::Role;

    #[test]
    fn test_values_align_with_columns() {
        let membership = Membership::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            [Role::Admin].into_iter().collect(),
        );
        assert_eq!(membership.values().len(), Membership::COLUMNS.len());
    }

    #[test]
    fn test_roles_serialize_as_grant_map() {
        let membership = Membership::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            [Role::TeamLead].into_iter().collect(),
        );
        let values = membership.values();
        assert_eq!(values[2], SqlValue::Json(json!({ "teamlead": true })));
    }
}
