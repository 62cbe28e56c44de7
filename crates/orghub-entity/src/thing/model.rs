//! Generic resource entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use orghub_core::traits::Persistable;
use orghub_core::types::revision::Revision;
use orghub_core::types::value::SqlValue;

/// A tenant-owned resource. The archetype every further domain entity
/// follows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Thing {
    /// Unique resource identifier.
    pub id: Uuid,
    /// Optimistic-concurrency token.
    pub revision: Revision,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
    /// When the resource was last saved.
    pub updated_at: DateTime<Utc>,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Owning organisation.
    pub organisation_id: Uuid,
}

impl Thing {
    /// Create a new resource owned by `organisation_id`.
    pub fn new(name: &str, description: &str, organisation_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            revision: Revision::unsaved(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
            description: description.to_string(),
            organisation_id,
        }
    }

    /// Display label.
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.description)
    }
}

impl Persistable for Thing {
    const TABLE: &'static str = "things";
    const COLUMNS: &'static [&'static str] = &["name", "description", "organisation_id"];

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
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.description.clone()),
            SqlValue::Uuid(self.organisation_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_align_with_columns() {
        let thing = Thing::new("Widget", "A widget", Uuid::new_v4());
        assert_eq!(thing.values().len(), Thing::COLUMNS.len());
    }

    #[test]
    fn test_label_joins_name_and_description() {
        let thing = Thing::new("Widget", "A widget", Uuid::new_v4());
        assert_eq!(thing.label(), "Widget - A widget");
    }
}
