use core::fmt;

use serde::{Deserialize, Serialize};

use rolegate_core::{Entity, RoleId};

/// Machine key of a role.
///
/// The roles the policy layer reasons about by name are closed variants;
/// anything else seeded into the store is carried as `Custom`. Always build
/// values through `From<&str>`/`From<String>` so a known name never ends up
/// wrapped in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleName {
    SuperUser,
    Admin,
    Manager,
    SalesManager,
    Seller,
    Viewer,
    Visitor,
    Custom(String),
}

impl RoleName {
    pub fn as_str(&self) -> &str {
        match self {
            RoleName::SuperUser => "super_user",
            RoleName::Admin => "admin",
            RoleName::Manager => "manager",
            RoleName::SalesManager => "sales_manager",
            RoleName::Seller => "seller",
            RoleName::Viewer => "viewer",
            RoleName::Visitor => "visitor",
            RoleName::Custom(name) => name,
        }
    }

    /// Functional team this role belongs to, derived from its name.
    ///
    /// Custom roles join a team through their name prefix (`sales_*`).
    pub fn team(&self) -> Option<Team> {
        match self {
            RoleName::SalesManager | RoleName::Seller => Some(Team::Sales),
            RoleName::Custom(name) if name.starts_with("sales_") => Some(Team::Sales),
            _ => None,
        }
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        match value {
            "super_user" => RoleName::SuperUser,
            "admin" => RoleName::Admin,
            "manager" => RoleName::Manager,
            "sales_manager" => RoleName::SalesManager,
            "seller" => RoleName::Seller,
            "viewer" => RoleName::Viewer,
            "visitor" => RoleName::Visitor,
            other => RoleName::Custom(other.to_string()),
        }
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        RoleName::from(value.as_str())
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional team used to narrow which roles a team lead may hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Sales,
}

/// A role row.
///
/// `priority` totally orders roles for hierarchy checks: higher is more senior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub label: String,
    pub priority: u32,
}

impl Role {
    pub fn new(name: impl Into<RoleName>, label: impl Into<String>, priority: u32) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
            label: label.into(),
            priority,
        }
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_parse_to_closed_variants() {
        assert_eq!(RoleName::from("super_user"), RoleName::SuperUser);
        assert_eq!(RoleName::from("visitor"), RoleName::Visitor);
        assert_eq!(RoleName::from("auditor"), RoleName::Custom("auditor".into()));
    }

    #[test]
    fn serializes_as_plain_machine_key() {
        let json = serde_json::to_string(&RoleName::SalesManager).unwrap();
        assert_eq!(json, "\"sales_manager\"");

        let back: RoleName = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(back, RoleName::Admin);
    }

    #[test]
    fn team_is_a_predicate_over_the_name() {
        assert_eq!(RoleName::Seller.team(), Some(Team::Sales));
        assert_eq!(RoleName::from("sales_intern").team(), Some(Team::Sales));
        assert_eq!(RoleName::Admin.team(), None);
    }
}
