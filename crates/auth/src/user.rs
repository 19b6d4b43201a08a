//! User record as seen by the authorization core.
//!
//! Credentials and profile fields live elsewhere; this is the slice the
//! policy needs: identity, active flag and the single role reference.

use serde::{Deserialize, Serialize};

use rolegate_core::{Entity, RoleId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    /// At most one role per user; `None` until one is assigned.
    pub role_id: Option<RoleId>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into().trim().to_string(),
            email: email.into().trim().to_lowercase(),
            is_active: true,
            role_id: None,
        }
    }

    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Deactivated users keep their row (and role) but cannot be impersonated.
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
