//! `rolegate-core`: identity and persistence building blocks shared by the
//! authorization crates.
//!
//! This crate is pure: no IO, no logging, no policy.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use id::{PermissionId, RoleId, UserId};
