use std::collections::BTreeSet;

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rolegate_core::{Entity, PermissionId};

/// Machine key of a permission.
///
/// Permissions checked by the authorization core are closed variants.
/// Permissions seeded for feature screens travel as `Custom` and are only
/// ever looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PermissionName {
    AssignRoles,
    ManageUsers,
    ManageRoles,
    ImpersonateUsers,
    ViewUsers,
    Custom(String),
}

impl PermissionName {
    pub fn as_str(&self) -> &str {
        match self {
            PermissionName::AssignRoles => "assign_roles",
            PermissionName::ManageUsers => "manage_users",
            PermissionName::ManageRoles => "manage_roles",
            PermissionName::ImpersonateUsers => "impersonate_users",
            PermissionName::ViewUsers => "view_users",
            PermissionName::Custom(name) => name,
        }
    }
}

impl From<&str> for PermissionName {
    fn from(value: &str) -> Self {
        match value {
            "assign_roles" => PermissionName::AssignRoles,
            "manage_users" => PermissionName::ManageUsers,
            "manage_roles" => PermissionName::ManageRoles,
            "impersonate_users" => PermissionName::ImpersonateUsers,
            "view_users" => PermissionName::ViewUsers,
            other => PermissionName::Custom(other.to_string()),
        }
    }
}

impl From<String> for PermissionName {
    fn from(value: String) -> Self {
        PermissionName::from(value.as_str())
    }
}

impl From<PermissionName> for String {
    fn from(value: PermissionName) -> Self {
        match value {
            PermissionName::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: PermissionName,
    pub label: String,
}

impl Permission {
    pub fn new(name: impl Into<PermissionName>, label: impl Into<String>) -> Self {
        Self {
            id: PermissionId::new(),
            name: name.into(),
            label: label.into(),
        }
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// JSON payload stored on a user ↔ permission grant.
///
/// Only `can_impersonate_any` is interpreted (and only on an
/// `impersonate_users` grant); anything else is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionMeta {
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub can_impersonate_any: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PermissionMeta {
    pub fn impersonate_any() -> Self {
        Self {
            can_impersonate_any: true,
            ..Default::default()
        }
    }
}

/// A permission granted directly to a user (not through their role).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectGrant {
    pub permission: PermissionName,
    #[serde(default)]
    pub meta: Option<PermissionMeta>,
}

/// Deduplicated set of permission names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionName>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(names.into_iter().map(|n| PermissionName::from(n.as_ref())).collect())
    }

    pub fn contains(&self, permission: &PermissionName) -> bool {
        self.0.contains(permission)
    }

    pub fn insert(&mut self, permission: PermissionName) -> bool {
        self.0.insert(permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionName> {
        self.0.iter()
    }

    /// Flattened names. This is the cached representation.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl FromIterator<PermissionName> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PermissionName> for PermissionSet {
    fn extend<T: IntoIterator<Item = PermissionName>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}
