//! Request-scoped query descriptors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::filter::{FilterRegistry, FilterSet};
use super::pagination::PageRequest;
use super::query::EntityQuery;

/// Key/value input in the shape the transport layer hands over: repeated
/// keys accumulate, lookup order is preserved per key.
///
/// The keys this core consumes: `page` / `page_size` for the window,
/// `filter` / `custom-filter` naming registered filters, and `phrase`
/// for free-text search.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery(HashMap<String, Vec<String>>);

impl RequestQuery {
    /// Build from an iterator of key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            map.entry(key.into()).or_default().push(value.into());
        }
        Self(map)
    }

    /// The first value for a key.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value for a key, in arrival order.
    pub fn all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The free-text search phrase, if present.
    pub fn phrase(&self) -> Option<&str> {
        self.first("phrase")
    }
}

/// Everything one list request asks for: the query variant, the toggled
/// filters, and the pagination window. Constructed per request, never
/// persisted; collections retain it alongside their results so page
/// links can be derived without re-deriving filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criteria {
    /// The query variant selecting the base predicate.
    pub query: EntityQuery,
    /// Additional predicates, composed with the query predicate.
    #[serde(default)]
    pub filters: FilterSet,
    /// The page window.
    #[serde(default)]
    pub pagination: PageRequest,
}

impl Criteria {
    /// A criteria with no filters and the default page window.
    pub fn new(query: EntityQuery) -> Self {
        Self {
            query,
            filters: FilterSet::default(),
            pagination: PageRequest::default(),
        }
    }

    /// Replace the filter tree.
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Replace the page window.
    pub fn with_pagination(mut self, pagination: PageRequest) -> Self {
        self.pagination = pagination;
        self
    }

    /// Build a criteria from request input: filters resolved against the
    /// collection's registry (unknown ids ignored) and the page window
    /// parsed with defaults.
    pub fn from_request(query: EntityQuery, req: &RequestQuery, registry: &FilterRegistry) -> Self {
        Self {
            query,
            filters: FilterSet::from_request(req, registry),
            pagination: PageRequest::from_request(req),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::filter::standard_filters;
    use uuid::Uuid;

    #[test]
    fn test_request_query_accumulates_repeated_keys() {
        let req = RequestQuery::from_pairs([
            ("custom-filter", "a"),
            ("custom-filter", "b"),
            ("page", "3"),
        ]);
        assert_eq!(req.all("custom-filter"), ["a", "b"]);
        assert_eq!(req.first("page"), Some("3"));
        assert!(req.phrase().is_none());
    }

    #[test]
    fn test_from_request_assembles_all_parts() {
        let registry = FilterRegistry::from_filters(standard_filters("things"));
        let req = RequestQuery::from_pairs([
            ("custom-filter", "created-within-24hrs"),
            ("page", "2"),
            ("page_size", "10"),
        ]);
        let criteria =
            Criteria::from_request(EntityQuery::ByOrganisation(Uuid::new_v4()), &req, &registry);
        assert_eq!(criteria.pagination, PageRequest::new(2, 10));
        assert_eq!(criteria.filters.active().len(), 1);
    }
}
