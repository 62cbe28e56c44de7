//! The optimistic-concurrency fencing token.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque revision token carried by every revisioned entity.
///
/// A fresh token is issued on every successful save; a save presenting a
/// token that does not match the stored value fails with a revision
/// conflict and leaves the row unmodified. Only equality is meaningful;
/// callers must not rely on any internal structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Generate a fresh token, distinct from every previously issued one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The token an entity holds before its first save.
    pub fn unsaved() -> Self {
        Self::default()
    }

    /// Whether this is the pre-first-save token.
    pub fn is_unsaved(&self) -> bool {
        self.0.is_empty()
    }

    /// The token as a string slice, for binding.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Revision {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for Revision {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Revision {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Revision {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(Revision::generate(), Revision::generate());
    }

    #[test]
    fn test_unsaved_token_is_recognized() {
        assert!(Revision::unsaved().is_unsaved());
        assert!(!Revision::generate().is_unsaved());
    }

    #[test]
    fn test_serde_is_transparent() {
        let rev = Revision::generate();
        let json = serde_json::to_string(&rev).expect("serialize");
        assert_eq!(json, format!("\"{rev}\""));
    }
}
