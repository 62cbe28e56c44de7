//! Communication log entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use orghub_core::traits::Persistable;
use orghub_core::types::revision::Revision;
use orghub_core::types::value::SqlValue;

/// A record of one outbound communication (email, SMS, ...) sent on
/// behalf of an organisation. Written after delivery is handed off,
/// never inside the delivery path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Communication {
    /// Unique communication identifier.
    pub id: Uuid,
    /// Optimistic-concurrency token.
    pub revision: Revision,
    /// When the communication was logged.
    pub created_at: DateTime<Utc>,
    /// When the record was last saved.
    pub updated_at: DateTime<Utc>,
    /// The organisation on whose behalf it was sent.
    pub organisation_id: Uuid,
    /// The recipient user, when the recipient is a known account.
    pub user_id: Option<Uuid>,
    /// Delivery channel, e.g. `"email"`.
    pub channel: String,
    /// Subject line or summary.
    pub subject: String,
}

impl Communication {
    /// Log a communication sent on behalf of `organisation_id`.
    pub fn new(organisation_id: Uuid, channel: &str, subject: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            revision: Revision::unsaved(),
            created_at: now,
            updated_at: now,
            organisation_id,
            user_id: None,
            channel: channel.to_string(),
            subject: subject.to_string(),
        }
    }

    /// Attribute the communication to a recipient account.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// When the communication went out.
    pub fn sent(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.subject
    }
}

impl Persistable for Communication {
    const TABLE: &'static str = "communications";
    const COLUMNS: &'static [&'static str] =
        &["organisation_id", "user_id", "channel", "subject"];

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
            SqlValue::Uuid(self.organisation_id),
            SqlValue::OptUuid(self.user_id),
            SqlValue::Text(self.channel.clone()),
            SqlValue::Text(self.subject.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_align_with_columns() {
        let comm = Communication::new(Uuid::new_v4(), "email", "Welcome");
        assert_eq!(comm.values().len(), Communication::COLUMNS.len());
    }

    #[test]
    fn test_with_user_attributes_recipient() {
        let user = Uuid::new_v4();
        let comm = Communication::new(Uuid::new_v4(), "email", "Welcome").with_user(user);
        assert_eq!(comm.user_id, Some(user));
    }
}
