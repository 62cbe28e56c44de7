//! Organisation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use orghub_core::traits::Persistable;
use orghub_core::types::revision::Revision;
use orghub_core::types::value::SqlValue;

/// A tenant. Every tenant-scoped entity carries an organisation id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organisation {
    /// Unique organisation identifier.
    pub id: Uuid,
    /// Optimistic-concurrency token.
    pub revision: Revision,
    /// When the organisation was created.
    pub created_at: DateTime<Utc>,
    /// When the organisation was last saved.
    pub updated_at: DateTime<Utc>,
    /// Display name.
    pub name: String,
    /// Country code or name.
    pub country: String,
}

impl Organisation {
    /// Create a new organisation.
    pub fn new(name: &str, country: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            revision: Revision::unsaved(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
            country: country.to_string(),
        }
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.name
    }
}

impl Persistable for Organisation {
    const TABLE: &'static str = "organisations";
    const COLUMNS: &'static [&'static str] = &["name", "country"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn revision(&self) -> &Revision {
        &self.revision
    }

    fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }

    // An organisation is its own tenant scope: its audit records land in
    // its own organisation-scoped history.
    fn organisation_id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.country.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_align_with_columns() {
        let org = Organisation::new("Acme", "AU");
        assert_eq!(org.values().len(), Organisation::COLUMNS.len());
    }

    #[test]
    fn test_audit_scope_is_self() {
        let org = Organisation::new("Acme", "AU");
        assert_eq!(org.organisation_id(), Some(org.id));
    }
}
