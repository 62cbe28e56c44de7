//! Pagination types for list queries.

use serde::{Deserialize, Serialize};

use super::criteria::RequestQuery;

/// Default page size.
const DEFAULT_PAGE_SIZE: u64 = 25;
/// Maximum page size.
const MAX_PAGE_SIZE: u64 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl PageRequest {
    /// Create a new page request.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Parse the `page` / `page_size` request keys, falling back to the
    /// defaults for absent or unparseable values.
    pub fn from_request(req: &RequestQuery) -> Self {
        let page = req
            .first("page")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(1);
        let page_size = req
            .first("page_size")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(page, page_size)
    }

    /// Calculate the SQL `OFFSET` value.
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) * self.page_size
    }

    /// Return the SQL `LIMIT` value.
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Render the pagination window as a SQL fragment.
    pub fn sql_clause(&self) -> String {
        format!(" LIMIT {} OFFSET {}", self.limit(), self.offset())
    }

    /// The request for the following page.
    pub fn next(&self) -> PageRequest {
        Self::new(self.page + 1, self.page_size)
    }

    /// The request for the preceding page, if any.
    pub fn previous(&self) -> Option<PageRequest> {
        (self.page > 1).then(|| Self::new(self.page - 1, self.page_size))
    }

    /// Derive page-link descriptors from this window and a total count.
    pub fn links(&self, total_items: u64) -> PageLinks {
        PageLinks::new(self.page, self.page_size, total_items)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Forward/backward page descriptors derived purely from the current
/// page index and the total count; no cursor state is retained between
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLinks {
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total_items: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether there is a next page.
    pub has_next: bool,
    /// Whether there is a previous page.
    pub has_previous: bool,
}

impl PageLinks {
    /// Compute page links for a window over `total_items` rows.
    pub fn new(page: u64, page_size: u64, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(page_size)
        };
        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }

    /// The page numbers up to and including the current page.
    pub fn pages(&self) -> Vec<u64> {
        (1..=self.page.min(self.total_pages)).collect()
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let page = PageRequest::new(3, 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 10);
        assert_eq!(page.sql_clause(), " LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(PageRequest::new(1, 0).page_size, 1);
        assert_eq!(PageRequest::new(1, 500).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(0, 10).page, 1);
    }

    #[test]
    fn test_consecutive_windows_are_disjoint() {
        let first = PageRequest::new(1, 25);
        let second = first.next();
        assert_eq!(first.offset() + first.limit(), second.offset());
        assert_eq!(second.previous(), Some(first));
        assert_eq!(PageRequest::new(1, 25).previous(), None);
    }

    #[test]
    fn test_links_cover_all_rows() {
        let links = PageRequest::new(2, 10).links(35);
        assert_eq!(links.total_pages, 4);
        assert!(links.has_next);
        assert!(links.has_previous);
        assert_eq!(links.pages(), vec![1, 2]);

        let empty = PageRequest::default().links(0);
        assert_eq!(empty.total_pages, 1);
        assert!(!empty.has_next);
        assert!(!empty.has_previous);
    }

    #[test]
    fn test_from_request_defaults() {
        let req = RequestQuery::from_pairs([("page", "2"), ("page_size", "50")]);
        let page = PageRequest::from_request(&req);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 50);

        let blank = PageRequest::from_request(&RequestQuery::default());
        assert_eq!(blank, PageRequest::default());
    }
}
