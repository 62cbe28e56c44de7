//! Generic resource ("thing") entity.

pub mod model;

pub use model::Thing;
