//! Contracts between the core types and the persistence layer.

pub mod persistable;

pub use persistable::Persistable;
