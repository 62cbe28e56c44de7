//! Audit snapshot rules and diff computation.
//!
//! The write side lives in [`crate::store`]: every save and delete
//! carries its audit insert in the same statement. This module owns the
//! shared snapshot rules (which tables are audited, which columns are
//! stripped) and the read-time diff; history read-back lives in
//! [`crate::repositories::audit`].

use std::collections::BTreeSet;

use serde_json::Value;

use orghub_core::traits::Persistable;
use orghub_entity::communication::Communication;
use orghub_entity::membership::Membership;
use orghub_entity::organisation::Organisation;
use orghub_entity::thing::Thing;
use orghub_entity::user::User;

/// Every audited table with the columns stripped from its snapshots.
pub const AUDITED_TABLES: [(&str, &[&str]); 5] = [
    (User::TABLE, User::SENSITIVE),
    (Organisation::TABLE, Organisation::SENSITIVE),
    (Membership::TABLE, Membership::SENSITIVE),
    (Thing::TABLE, Thing::SENSITIVE),
    (Communication::TABLE, Communication::SENSITIVE),
];

/// The sensitive columns for an audited table.
///
/// `None` means the table is not audited; callers must never interpolate
/// such a name into SQL, whatever the audit log claims.
pub fn sensitive_columns(table: &str) -> Option<&'static [&'static str]> {
    AUDITED_TABLES
        .into_iter()
        .find(|(name, _)| *name == table)
        .map(|(_, sensitive)| sensitive)
}

/// Render the `- 'col'` exclusion chain appended to a `to_jsonb` snapshot.
pub(crate) fn exclusion_sql(sensitive: &[&str]) -> String {
    sensitive.iter().map(|col| format!(" - '{col}'")).collect()
}

/// Field-level delta between two snapshots, restricted to changed keys.
///
/// Empty exactly when the snapshots are field-identical.
pub fn field_diff(old: &Value, new: &Value) -> String {
    let empty = serde_json::Map::new();
    let old_map = old.as_object().unwrap_or(&empty);
    let new_map = new.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();
    let mut parts = Vec::new();
    for key in keys {
        let old_value = old_map.get(key.as_str());
        let new_value = new_map.get(key.as_str());
        if old_value == new_value {
            continue;
        }
        let part = match (old_value, new_value) {
            (Some(o), Some(n)) => format!("{key}: {o} -> {n}"),
            (None, Some(n)) => format!("{key}: -> {n}"),
            (Some(o), None) => format!("{key}: {o} ->"),
            (None, None) => continue,
        };
        parts.push(part);
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_restricted_to_changed_keys() {
        let old = json!({ "name": "foo", "country": "AU" });
        let new = json!({ "name": "bar", "country": "AU" });
        assert_eq!(field_diff(&old, &new), "name: \"foo\" -> \"bar\"");
    }

    #[test]
    fn test_diff_empty_for_identical_snapshots() {
        let snapshot = json!({ "name": "foo", "verified": true });
        assert_eq!(field_diff(&snapshot, &snapshot), "");
    }

    #[test]
    fn test_diff_covers_added_and_removed_keys() {
        let old = json!({ "name": "foo", "legacy": 1 });
        let new = json!({ "name": "foo", "description": "fresh" });
        assert_eq!(field_diff(&old, &new), "description: -> \"fresh\", legacy: 1 ->");
    }

    #[test]
    fn test_sensitive_columns_known_tables_only() {
        assert_eq!(
            sensitive_columns("users"),
            Some(&["password", "totp_secret", "recovery_codes"][..])
        );
        assert_eq!(sensitive_columns("organisations"), Some(&[][..]));
        assert_eq!(sensitive_columns("audit_log; DROP TABLE users"), None);
    }

    #[test]
    fn test_exclusion_sql_chains_columns() {
        assert_eq!(exclusion_sql(&["password", "totp_secret"]), " - 'password' - 'totp_secret'");
        assert_eq!(exclusion_sql(&[]), "");
    }
}
