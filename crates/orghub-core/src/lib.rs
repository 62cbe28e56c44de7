//! # orghub-core
//!
//! Core crate for OrgHub. Contains the unified error system, configuration
//! schemas, the role model, the persistence contract ([`traits::Persistable`]),
//! query/filter/pagination/criteria types, and the concurrent fan-out helper.
//!
//! This crate has **no** internal dependencies on other OrgHub crates.

pub mod config;
pub mod error;
pub mod parallel;
pub mod result;
pub mod roles;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
