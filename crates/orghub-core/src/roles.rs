//! Organisation role model.
//!
//! Roles are granted per organisation membership and form a small
//! implication hierarchy: holding a role also satisfies checks for every
//! role it implies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A role grantable to an organisation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control within the organisation.
    Admin,
    /// Day-to-day management rights.
    TeamLead,
}

impl Role {
    /// Every valid role.
    pub const ALL: [Role; 2] = [Role::Admin, Role::TeamLead];

    /// Stable machine name, used as the JSONB grant key.
    pub fn name(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::TeamLead => "teamlead",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::TeamLead => "Team Lead",
        }
    }

    /// Roles directly implied by holding this role.
    pub fn implies(self) -> &'static [Role] {
        match self {
            Self::Admin => &[Role::TeamLead],
            Self::TeamLead => &[],
        }
    }

    /// Whether holding this role satisfies a check for `other`.
    pub fn can(self, other: Role) -> bool {
        if self == other {
            return true;
        }
        self.implies().iter().any(|implied| implied.can(other))
    }

    /// Resolve a role from its stable machine name.
    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.name() == name)
    }
}

/// The set of roles granted to one organisation membership.
///
/// Stored as a JSONB object of `{ "role-name": true }` grants, matching
/// the membership table schema. Lookups resolve the implication hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeMap<String, bool>);

impl RoleSet {
    /// An empty grant set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role.
    pub fn grant(&mut self, role: Role) {
        self.0.insert(role.name().to_string(), true);
    }

    /// Revoke a role.
    pub fn revoke(&mut self, role: Role) {
        self.0.remove(role.name());
    }

    /// Whether any granted role satisfies a check for `role`.
    pub fn can(&self, role: Role) -> bool {
        self.0
            .iter()
            .filter(|(_, granted)| **granted)
            .filter_map(|(name, _)| Role::from_name(name))
            .any(|granted| granted.can(role))
    }

    /// The roles explicitly granted, in stable order.
    pub fn granted(&self) -> Vec<Role> {
        self.0
            .iter()
            .filter(|(_, granted)| **granted)
            .filter_map(|(name, _)| Role::from_name(name))
            .collect()
    }

    /// Whether no role is granted.
    pub fn is_empty(&self) -> bool {
        !self.0.values().any(|granted| *granted)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.grant(role);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_implies_teamlead() {
        assert!(Role::Admin.can(Role::TeamLead));
        assert!(!Role::TeamLead.can(Role::Admin));
    }

    #[test]
    fn test_role_set_resolves_implications() {
        let admins: RoleSet = [Role::Admin].into_iter().collect();
        assert!(admins.can(Role::Admin));
        assert!(admins.can(Role::TeamLead));

        let leads: RoleSet = [Role::TeamLead].into_iter().collect();
        assert!(leads.can(Role::TeamLead));
        assert!(!leads.can(Role::Admin));
    }

    #[test]
    fn test_role_set_ignores_unknown_and_revoked_grants() {
        let mut set = RoleSet::new();
        set.0.insert("superhero".to_string(), true);
        set.grant(Role::TeamLead);
        set.revoke(Role::TeamLead);
        assert!(!set.can(Role::TeamLead));
        assert!(set.is_empty());
    }

    #[test]
    fn test_serde_shape_matches_grant_map() {
        let admins: RoleSet = [Role::Admin].into_iter().collect();
        let json = serde_json::to_value(&admins).expect("serialize");
        assert_eq!(json, serde_json::json!({ "admin": true }));
    }
}
