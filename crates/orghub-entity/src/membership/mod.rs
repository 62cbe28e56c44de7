//! Organisation membership entity.

pub mod model;

pub use model::Membership;
