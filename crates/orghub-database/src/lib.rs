//! # orghub-database
//!
//! PostgreSQL connection management, the generic revisioned store, the
//! transactional audit trail, federated search, and the per-entity
//! collection repositories.
//!
//! Every operation executes against a `&mut PgConnection` supplied by
//! the caller. A mutating request owns one transaction for its lifetime;
//! the store itself never opens, commits, or rolls back.

pub mod audit;
pub mod connection;
pub mod migration;
pub mod repositories;
pub mod search;
pub mod store;

pub use connection::DatabasePool;
