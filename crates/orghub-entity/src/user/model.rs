//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use orghub_core::traits::Persistable;
use orghub_core::types::revision::Revision;
use orghub_core::types::value::SqlValue;

/// A registered account. Users are tenant-less: they gain access to
/// organisations through memberships.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Optimistic-concurrency token.
    pub revision: Revision,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last saved.
    pub updated_at: DateTime<Utc>,
    /// Login email, stored lowercased.
    pub email: String,
    /// Password hash (hashing itself happens upstream).
    #[serde(skip_serializing)]
    pub password: String,
    /// Whether the account holds instance-wide admin rights.
    pub super_admin: bool,
    /// Whether the email address has been verified.
    pub verified: bool,
    /// Whether a verification email has been sent.
    pub verification_email_sent: bool,
    /// TOTP shared secret, if two-factor auth is set up.
    #[serde(skip_serializing)]
    pub totp_secret: Option<String>,
    /// One-time recovery codes, if generated.
    #[serde(skip_serializing)]
    pub recovery_codes: Option<Vec<String>>,
}

impl User {
    /// Create a new unverified user. The email is lowercased; the
    /// password must already be hashed.
    pub fn new(email: &str, password_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            revision: Revision::unsaved(),
            created_at: now,
            updated_at: now,
            email: email.to_lowercase(),
            password: password_hash.to_string(),
            super_admin: false,
            verified: false,
            verification_email_sent: false,
            totp_secret: None,
            recovery_codes: None,
        }
    }

    /// Whether the account has an email address at all.
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.email
    }
}

impl Persistable for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "email",
        "password",
        "super_admin",
        "verified",
        "verification_email_sent",
        "totp_secret",
        "recovery_codes",
    ];
    const SENSITIVE: &'static [&'static str] = &["password", "totp_secret", "recovery_codes"];

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
        None
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.email.clone()),
            SqlValue::Text(self.password.clone()),
            SqlValue::Bool(self.super_admin),
            SqlValue::Bool(self.verified),
            SqlValue::Bool(self.verification_email_sent),
            SqlValue::OptText(self.totp_secret.clone()),
            SqlValue::OptTextArray(self.recovery_codes.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lowercases_email() {
        let user = User::new("Jo@Example.COM", "hash");
        assert_eq!(user.email, "jo@example.com");
        assert!(!user.verified);
        assert!(user.revision.is_unsaved());
    }

    #[test]
    fn test_values_align_with_columns() {
        let user = User::new("jo@example.com", "hash");
        assert_eq!(user.values().len(), User::COLUMNS.len());
    }

    #[test]
    fn test_sensitive_columns_cover_secrets() {
        for secret in ["password", "totp_secret", "recovery_codes"] {
            assert!(User::SENSITIVE.contains(&secret));
        }
    }

    #[test]
    fn test_serialization_skips_secrets() {
        let mut user = User::new("jo@example.com", "hash");
        user.totp_secret = Some("shh".to_string());
        let json = serde_json::to_value(&user).expect("serialize");
        assert!(json.get("password").is_none());
        assert!(json.get("totp_secret").is_none());
        assert!(json.get("recovery_codes").is_none());
        assert_eq!(json["email"], "jo@example.com");
    }
}
