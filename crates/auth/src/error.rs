//! Outcome taxonomy at the operation boundary.

use core::fmt;

use thiserror::Error;

use rolegate_core::{StoreError, UserId};

use crate::CacheError;
use crate::policy::Denial;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    User,
    Role,
    Permission,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotFoundKind::User => "user",
            NotFoundKind::Role => "role",
            NotFoundKind::Permission => "permission",
        })
    }
}

/// Why an exposed operation did not succeed.
///
/// `PermissionDenied` means "not authorized", `NotFound` means "stale
/// reference, retry", `InvalidState` is a client usage error. Everything else
/// is a server-side fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("permission denied: {0}")]
    PermissionDenied(Denial),

    #[error("{kind} not found: {name}")]
    NotFound { kind: NotFoundKind, name: String },

    #[error("invalid state: {0}")]
    InvalidState(Denial),

    /// The impersonator recorded in the session no longer resolves to a user.
    /// The impersonation keys have already been cleared.
    #[error("impersonation session is inconsistent: original user {} cannot be restored", display_opt(.original_user_id))]
    InconsistentSession { original_user_id: Option<UserId> },

    #[error("no authenticated user in session")]
    Unauthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

fn display_opt(id: &Option<UserId>) -> String {
    id.map_or_else(|| "<unreadable>".to_string(), |id| id.to_string())
}

impl AccessError {
    pub fn not_found(kind: NotFoundKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// The denial carried by `PermissionDenied` / `InvalidState`, if any.
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AccessError::PermissionDenied(d) | AccessError::InvalidState(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessError::PermissionDenied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AccessError::NotFound { .. })
    }
}
