//! # orghub-entity
//!
//! Domain entity models for OrgHub. Every struct in this crate represents
//! a database table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and database entities
//! additionally derive `sqlx::FromRow` and implement
//! [`orghub_core::traits::Persistable`].

pub mod audit;
pub mod communication;
pub mod membership;
pub mod organisation;
pub mod thing;
pub mod user;
