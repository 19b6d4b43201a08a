//! Authorization policy: pure decision functions.
//!
//! - No IO
//! - No panics
//! - Deny by default: a missing permission or an unmet priority condition is
//!   a `Denial`, never a silent downgrade
//!
//! Every check is evaluated against an [`Actor`], which the service layer only
//! builds from the security principal (the real human while impersonating).

use std::collections::BTreeMap;

use serde::Serialize;

use rolegate_core::UserId;

use crate::messages::{self, Locale};
use crate::{DirectGrant, PermissionName, PermissionSet, Role, RoleName, Team};

// ─────────────────────────────────────────────────────────────────────────────
// Denials
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    MissingPermission,
    SelfDemotion,
    HigherRole,
    TopRoleReserved,
    TeamRestriction,
    SelfImpersonation,
    InactiveTarget,
    SeniorTarget,
    AlreadyImpersonating,
    NotImpersonating,
}

/// Why an operation was refused, with a reason ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub kind: DenialKind,
    pub reason: String,
}

impl Denial {
    pub fn new(kind: DenialKind, locale: Locale) -> Self {
        Self {
            kind,
            reason: messages::reason(kind, locale, None),
        }
    }

    pub fn missing_permission(permission: &PermissionName, locale: Locale) -> Self {
        Self {
            kind: DenialKind::MissingPermission,
            reason: messages::reason(DenialKind::MissingPermission, locale, Some(permission.as_str())),
        }
    }
}

impl core::fmt::Display for Denial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.reason)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// How far an `impersonate_users` holder may reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpersonationScope {
    /// Only users whose role priority is strictly lower than the actor's.
    #[default]
    Subordinates,
    /// Any active user, the top role included.
    Any,
}

impl ImpersonationScope {
    /// Read the scope from the `meta` of a direct `impersonate_users` grant.
    pub fn from_grants(grants: &[DirectGrant]) -> Self {
        let any = grants.iter().any(|g| {
            g.permission == PermissionName::ImpersonateUsers
                && g.meta.as_ref().is_some_and(|m| m.can_impersonate_any)
        });
        if any { Self::Any } else { Self::Subordinates }
    }
}

/// The user on whose privileges a decision is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub permissions: PermissionSet,
    pub impersonation_scope: ImpersonationScope,
}

impl Actor {
    /// Users without a role rank below every role.
    pub fn priority(&self) -> u32 {
        self.role.as_ref().map_or(0, |r| r.priority)
    }

    pub fn holds(&self, permission: &PermissionName) -> bool {
        self.permissions.contains(permission)
    }
}

/// The user an impersonation request points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUser {
    pub user_id: UserId,
    pub is_active: bool,
    pub role: Option<Role>,
}

impl TargetUser {
    pub fn priority(&self) -> u32 {
        self.role.as_ref().map_or(0, |r| r.priority)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Deployment-level role rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    /// The most senior role; exempt from priority checks.
    pub top_role: RoleName,
    /// Role a user falls back to when their role is revoked.
    pub fallback_role: RoleName,
    /// Assigner role → the only team whose roles it may assign.
    pub team_restrictions: BTreeMap<RoleName, Team>,
    pub locale: Locale,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            top_role: RoleName::SuperUser,
            fallback_role: RoleName::Visitor,
            team_restrictions: BTreeMap::from([(RoleName::SalesManager, Team::Sales)]),
            locale: Locale::En,
        }
    }
}

impl RolePolicy {
    fn deny(&self, kind: DenialKind) -> Denial {
        Denial::new(kind, self.locale)
    }

    fn require(&self, actor: &Actor, permission: PermissionName) -> Result<(), Denial> {
        if actor.holds(&permission) {
            Ok(())
        } else {
            Err(Denial::missing_permission(&permission, self.locale))
        }
    }

    pub fn is_top(&self, role: &Role) -> bool {
        role.name == self.top_role
    }

    pub fn holds_top(&self, actor: &Actor) -> bool {
        actor.role.as_ref().is_some_and(|r| self.is_top(r))
    }

    fn team_allows(&self, actor: &Actor, role: &Role) -> bool {
        let Some(actor_role) = actor.role.as_ref() else {
            return true;
        };
        match self.team_restrictions.get(&actor_role.name) {
            Some(team) => role.name.team() == Some(*team),
            None => true,
        }
    }

    /// May `actor` give `role` to `target`?
    ///
    /// Equal priority passes; only a strictly higher role is refused.
    pub fn authorize_assign(&self, actor: &Actor, target: UserId, role: &Role) -> Result<(), Denial> {
        self.require(actor, PermissionName::AssignRoles)?;

        if self.holds_top(actor) {
            if target == actor.user_id && !self.is_top(role) {
                return Err(self.deny(DenialKind::SelfDemotion));
            }
            return Ok(());
        }

        if role.priority > actor.priority() {
            return Err(self.deny(DenialKind::HigherRole));
        }
        if self.is_top(role) {
            return Err(self.deny(DenialKind::TopRoleReserved));
        }
        if !self.team_allows(actor, role) {
            return Err(self.deny(DenialKind::TeamRestriction));
        }

        Ok(())
    }

    /// May `actor` reset `target` to the fallback role?
    ///
    /// No priority comparison against the target; a top-role holder still
    /// cannot revoke their own role.
    pub fn authorize_revoke(&self, actor: &Actor, target: UserId) -> Result<(), Denial> {
        self.require(actor, PermissionName::ManageUsers)?;

        if target == actor.user_id && self.holds_top(actor) && self.fallback_role != self.top_role {
            return Err(self.deny(DenialKind::SelfDemotion));
        }

        Ok(())
    }

    /// Grant or revoke a direct permission.
    pub fn authorize_permission_change(&self, actor: &Actor) -> Result<(), Denial> {
        self.require(actor, PermissionName::ManageUsers)
    }

    /// Replace a role's permission set.
    pub fn authorize_role_sync(&self, actor: &Actor) -> Result<(), Denial> {
        self.require(actor, PermissionName::ManageRoles)
    }

    /// May `actor` assume `target`'s identity?
    ///
    /// The "not already impersonating" guard belongs to the session state
    /// machine, not here.
    pub fn authorize_impersonation(&self, actor: &Actor, target: &TargetUser) -> Result<(), Denial> {
        if target.user_id == actor.user_id {
            return Err(self.deny(DenialKind::SelfImpersonation));
        }

        self.require(actor, PermissionName::ImpersonateUsers)?;

        if !target.is_active {
            return Err(self.deny(DenialKind::InactiveTarget));
        }

        if actor.impersonation_scope == ImpersonationScope::Subordinates
            && target.priority() >= actor.priority()
        {
            return Err(self.deny(DenialKind::SeniorTarget));
        }

        Ok(())
    }

    /// Whether `role` shows up in `actor`'s assignable-role listing.
    ///
    /// Stricter than `authorize_assign`: equal priority is not listed.
    pub fn is_assignable(&self, actor: &Actor, role: &Role) -> bool {
        if self.holds_top(actor) {
            return true;
        }
        !self.is_top(role) && role.priority < actor.priority() && self.team_allows(actor, role)
    }

    pub fn is_visible(&self, actor: &Actor, role: &Role) -> bool {
        self.holds_top(actor) || role.priority <= actor.priority()
    }

    pub fn assignable_roles(&self, actor: &Actor, roles: impl IntoIterator<Item = Role>) -> Vec<Role> {
        let mut out: Vec<Role> = roles.into_iter().filter(|r| self.is_assignable(actor, r)).collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        out
    }

    pub fn visible_roles(&self, actor: &Actor, roles: impl IntoIterator<Item = Role>) -> Vec<Role> {
        let mut out: Vec<Role> = roles.into_iter().filter(|r| self.is_visible(actor, r)).collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        out
    }
}
