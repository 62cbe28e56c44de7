//! The acting principal attributed on audit records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The sentinel recorded when no acting user is available.
pub const SYSTEM_ACTOR: &str = "system";

/// Who performed a mutation, as attributed on its audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// An authenticated user.
    User(Uuid),
    /// The system itself (background jobs, seeds, migrations).
    System,
}

impl Actor {
    /// The value stored in the audit log's `user_id` column.
    pub fn audit_id(&self) -> String {
        match self {
            Self::User(id) => id.to_string(),
            Self::System => SYSTEM_ACTOR.to_string(),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.audit_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_id() {
        let id = Uuid::new_v4();
        assert_eq!(Actor::User(id).audit_id(), id.to_string());
        assert_eq!(Actor::System.audit_id(), SYSTEM_ACTOR);
    }
}
