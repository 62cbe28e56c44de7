//! Core type definitions used across the OrgHub workspace.

pub mod actor;
pub mod criteria;
pub mod filter;
pub mod pagination;
pub mod query;
pub mod revision;
pub mod sorting;
pub mod value;

pub use actor::Actor;
pub use criteria::{Criteria, RequestQuery};
pub use filter::{Combinator, Filter, FilterKind, FilterNode, FilterRegistry, FilterSet};
pub use pagination::{PageLinks, PageRequest};
pub use query::{Constructed, EntityQuery};
pub use revision::Revision;
pub use sorting::{SortDirection, SortField};
pub use value::{Params, SqlValue};
