//! Composable, addressable query filters.
//!
//! A [`Filter`] is a named predicate contributing a parameterized SQL
//! fragment. Filters are registered in a [`FilterRegistry`] so a UI can
//! toggle them by stable id, and compose into a [`FilterSet`] tree with
//! an explicit AND/OR combinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::criteria::RequestQuery;
use super::value::{Params, SqlValue};

/// The predicate shapes a filter can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterKind {
    /// A column equals a literal value (compared as text).
    HasProp {
        /// Column name.
        column: String,
        /// Expected value.
        value: String,
    },
    /// A column matches any of a set of values (compared as text).
    MatchesAny {
        /// Column name.
        column: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// The row was created within the given interval (e.g. `"14 days"`).
    CreatedWithin {
        /// PostgreSQL interval literal.
        interval: String,
    },
    /// The row was updated within the given interval.
    UpdatedWithin {
        /// PostgreSQL interval literal.
        interval: String,
    },
    /// The row was created after the given instant.
    CreatedAfter {
        /// Lower bound.
        at: DateTime<Utc>,
    },
    /// The row was created before the given instant.
    CreatedBefore {
        /// Upper bound.
        at: DateTime<Utc>,
    },
    /// The row was updated after the given instant.
    UpdatedAfter {
        /// Lower bound.
        at: DateTime<Utc>,
    },
    /// The row was updated before the given instant.
    UpdatedBefore {
        /// Upper bound.
        at: DateTime<Utc>,
    },
}

/// A named, addressable predicate over one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    id: String,
    label: String,
    table: String,
    kind: FilterKind,
}

impl Filter {
    /// Create a filter.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        table: impl Into<String>,
        kind: FilterKind,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            table: table.into(),
            kind,
        }
    }

    /// Stable identifier used to toggle this filter from request input.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Render the predicate fragment, accumulating bind values.
    pub fn clause(&self, params: &mut Params) -> String {
        let table = &self.table;
        match &self.kind {
            FilterKind::HasProp { column, value } => {
                let p = params.push(SqlValue::Text(value.clone()));
                format!("{table}.{column}::text = {p}")
            }
            FilterKind::MatchesAny { column, values } => {
                let p = params.push(SqlValue::TextArray(values.clone()));
                format!("{table}.{column}::text = ANY({p})")
            }
            FilterKind::CreatedWithin { interval } => {
                let p = params.push(SqlValue::Text(interval.clone()));
                format!("age({table}.created_at) < {p}::interval")
            }
            FilterKind::UpdatedWithin { interval } => {
                let p = params.push(SqlValue::Text(interval.clone()));
                format!("age({table}.updated_at) < {p}::interval")
            }
            FilterKind::CreatedAfter { at } => {
                let p = params.push(SqlValue::Timestamp(*at));
                format!("{table}.created_at > {p}")
            }
            FilterKind::CreatedBefore { at } => {
                let p = params.push(SqlValue::Timestamp(*at));
                format!("{table}.created_at < {p}")
            }
            FilterKind::UpdatedAfter { at } => {
                let p = params.push(SqlValue::Timestamp(*at));
                format!("{table}.updated_at > {p}")
            }
            FilterKind::UpdatedBefore { at } => {
                let p = params.push(SqlValue::Timestamp(*at));
                format!("{table}.updated_at < {p}")
            }
        }
    }
}

/// How the members of a [`FilterSet`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Every member must match.
    And,
    /// Any member may match.
    Or,
}

impl Combinator {
    fn as_sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// A node in a filter tree: either a leaf predicate or a nested set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    /// A leaf predicate.
    Filter(Filter),
    /// A nested set with its own combinator.
    Set(FilterSet),
}

/// A tree of filters joined by an explicit combinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    /// How the member nodes combine.
    pub combinator: Combinator,
    /// The member nodes.
    pub nodes: Vec<FilterNode>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            combinator: Combinator::And,
            nodes: Vec::new(),
        }
    }
}

impl FilterSet {
    /// An AND set over the given filters.
    pub fn all(filters: Vec<Filter>) -> Self {
        Self {
            combinator: Combinator::And,
            nodes: filters.into_iter().map(FilterNode::Filter).collect(),
        }
    }

    /// An OR set over the given filters.
    pub fn any(filters: Vec<Filter>) -> Self {
        Self {
            combinator: Combinator::Or,
            nodes: filters.into_iter().map(FilterNode::Filter).collect(),
        }
    }

    /// Append a node.
    pub fn push(&mut self, node: FilterNode) {
        self.nodes.push(node);
    }

    /// Whether the tree holds no predicates at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            FilterNode::Filter(_) => false,
            FilterNode::Set(set) => set.is_empty(),
        })
    }

    /// Render the whole tree as one parenthesized predicate, or `None`
    /// when the tree is empty.
    pub fn clause(&self, params: &mut Params) -> Option<String> {
        let rendered: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                FilterNode::Filter(filter) => Some(filter.clause(params)),
                FilterNode::Set(set) => set.clause(params),
            })
            .collect();
        match rendered.len() {
            0 => None,
            1 => rendered.into_iter().next(),
            _ => Some(format!("({})", rendered.join(self.combinator.as_sql()))),
        }
    }

    /// The leaf filters of the tree, in render order.
    pub fn active(&self) -> Vec<&Filter> {
        let mut leaves = Vec::new();
        for node in &self.nodes {
            match node {
                FilterNode::Filter(filter) => leaves.push(filter),
                FilterNode::Set(set) => leaves.extend(set.active()),
            }
        }
        leaves
    }

    /// Resolve `filter` / `custom-filter` request keys against a
    /// registry. Unrecognized ids are ignored, not fatal.
    pub fn from_request(req: &RequestQuery, registry: &FilterRegistry) -> Self {
        let mut selected = Vec::new();
        for key in ["filter", "custom-filter"] {
            for id in req.all(key) {
                if let Some(filter) = registry.get(id) {
                    selected.push(filter.clone());
                }
            }
        }
        Self::all(selected)
    }
}

/// The known filters for one collection, addressable by id.
///
/// Built once at startup and passed by reference to whatever parses
/// request input; never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<Filter>,
}

impl FilterRegistry {
    /// Build a registry from a list of filters. Later entries shadow
    /// earlier ones with the same id.
    pub fn from_filters(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Extend the registry with further filters.
    pub fn with(mut self, extra: Vec<Filter>) -> Self {
        self.filters.extend(extra);
        self
    }

    /// Look up a filter by stable id.
    pub fn get(&self, id: &str) -> Option<&Filter> {
        self.filters.iter().rev().find(|filter| filter.id() == id)
    }

    /// All registered filters, for UI listings.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }
}

/// The interval filters every entity collection offers.
pub fn standard_filters(table: &str) -> Vec<Filter> {
    vec![
        Filter::new(
            "updated-within-fortnight",
            "Updated within the last fortnight",
            table,
            FilterKind::UpdatedWithin {
                interval: "14 days".to_string(),
            },
        ),
        Filter::new(
            "updated-within-24hrs",
            "Updated within 24 hours",
            table,
            FilterKind::UpdatedWithin {
                interval: "1 day".to_string(),
            },
        ),
        Filter::new(
            "created-within-fortnight",
            "Created within the last fortnight",
            table,
            FilterKind::CreatedWithin {
                interval: "14 days".to_string(),
            },
        ),
        Filter::new(
            "created-within-24hrs",
            "Created within 24 hours",
            table,
            FilterKind::CreatedWithin {
                interval: "1 day".to_string(),
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified() -> Filter {
        Filter::new(
            "user-is-verified",
            "Has Accepted Invite",
            "users",
            FilterKind::HasProp {
                column: "verified".to_string(),
                value: "true".to_string(),
            },
        )
    }

    #[test]
    fn test_has_prop_clause_binds_value() {
        let mut params = Params::new();
        let clause = verified().clause(&mut params);
        assert_eq!(clause, "users.verified::text = $1");
        assert_eq!(
            params.into_values(),
            vec![SqlValue::Text("true".to_string())]
        );
    }

    #[test]
    fn test_interval_clause_binds_interval() {
        let mut params = Params::new();
        let filter = &standard_filters("things")[0];
        let clause = filter.clause(&mut params);
        assert_eq!(clause, "age(things.updated_at) < $1::interval");
    }

    #[test]
    fn test_set_combines_with_parens() {
        let mut params = Params::new();
        let mut set = FilterSet::all(vec![verified()]);
        set.push(FilterNode::Set(FilterSet::any(standard_filters("users")
            .into_iter()
            .take(2)
            .collect())));
        let clause = set.clause(&mut params).expect("clause");
        assert_eq!(
            clause,
            "(users.verified::text = $1 AND (age(users.updated_at) < $2::interval OR age(users.updated_at) < $3::interval))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_set_renders_nothing() {
        let mut params = Params::new();
        assert!(FilterSet::default().clause(&mut params).is_none());
        assert!(FilterSet::default().is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_from_request_ignores_unknown_ids() {
        let registry = FilterRegistry::from_filters(standard_filters("users")).with(vec![verified()]);
        let req = RequestQuery::from_pairs([
            ("custom-filter", "user-is-verified"),
            ("custom-filter", "no-such-filter"),
            ("filter", "created-within-24hrs"),
        ]);
        let set = FilterSet::from_request(&req, &registry);
        let ids: Vec<&str> = set.active().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["created-within-24hrs", "user-is-verified"]);
    }
}
