//! Communication log entity.

pub mod model;

pub use model::Communication;
