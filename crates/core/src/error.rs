//! Persistence error model.

use thiserror::Error;

/// Result type returned by store adapters.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a persistent store adapter.
///
/// Absence of a record is usually modelled as `Ok(None)`; `NotFound` is for
/// writes that reference a row which disappeared underneath the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A uniqueness or referential constraint was violated.
    #[error("constraint violated: {0}")]
    Conflict(String),

    /// The backing store could not be reached (or its lock was poisoned).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
