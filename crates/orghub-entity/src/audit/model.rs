//! Audit record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The literal diff recorded for a creation.
pub const DIFF_CREATED: &str = "Created";
/// The literal diff recorded for a deletion.
pub const DIFF_DELETED: &str = "Deleted";

/// The mutation an audit record describes, stored as a one-letter code.
///
/// Creations share the `U` code with updates; they are told apart at
/// read time by the absence of an old snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// An insert or update.
    Update,
    /// A delete.
    Delete,
}

impl AuditAction {
    /// The stored one-letter code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Update => "U",
            Self::Delete => "D",
        }
    }

    /// Parse a stored code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "U" => Some(Self::Update),
            "D" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One immutable line of an entity's mutation history, as presented to
/// tenants.
///
/// Only the old snapshot is stored on disk; the new snapshot and the
/// diff are reconstructed when history is read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique audit record identifier.
    pub id: Uuid,
    /// The mutated entity.
    pub entity_id: Uuid,
    /// Tenant scope of the mutated entity, when it has one.
    pub organisation_id: Option<Uuid>,
    /// The mutated entity's table.
    pub table_name: String,
    /// When the mutation was written.
    pub stamp: DateTime<Utc>,
    /// The acting principal's id, or the system sentinel.
    pub user_id: String,
    /// The acting principal's display name, resolved at read time;
    /// falls back to `user_id`.
    pub user_name: String,
    /// One-letter action code (`U` or `D`).
    pub action: String,
    /// Pre-mutation snapshot, sensitive columns excluded.
    pub old_row_data: serde_json::Value,
    /// Post-mutation snapshot, reconstructed at read time.
    pub new_row_data: serde_json::Value,
    /// Field-level delta, or `"Created"` / `"Deleted"`.
    pub diff: String,
}

impl AuditRecord {
    /// Whether this record describes a deletion.
    pub fn is_delete(&self) -> bool {
        AuditAction::from_code(&self.action) == Some(AuditAction::Delete)
    }

    /// Whether this record describes the entity's creation.
    pub fn is_create(&self) -> bool {
        self.diff == DIFF_CREATED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes_round_trip() {
        assert_eq!(AuditAction::from_code("U"), Some(AuditAction::Update));
        assert_eq!(AuditAction::from_code("D"), Some(AuditAction::Delete));
        assert_eq!(AuditAction::from_code("X"), None);
        assert_eq!(AuditAction::Delete.code(), "D");
    }
}
