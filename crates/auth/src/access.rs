//! `AccessControl`: the operations offered to controllers and the UI.
//!
//! Every mutation follows the same order: authorize against the security
//! principal, persist, refresh the affected permission cache entry, then
//! inform the best-effort sinks. Once the change is persisted, neither a
//! cache failure nor a sink failure turns it into an error.

use std::sync::Arc;

use chrono::Utc;

use rolegate_core::UserId;

use crate::audit::{AuditSink, NullAuditSink, RequestMetadata};
use crate::cache::{CacheStore, PermissionCache, RoleInvalidation};
use crate::directory::{Directory, effective_permissions};
use crate::error::{AccessError, NotFoundKind};
use crate::impersonation::ImpersonationManager;
use crate::notify::{self, Notifier, NullNotifier, RoleChanged};
use crate::policy::{Actor, ImpersonationScope, RolePolicy};
use crate::session::{AuthSession, SecurityPrincipal, SessionPrincipal, SessionStore};
use crate::{Permission, PermissionMeta, PermissionName, PermissionSet, Role, RoleName, User};

pub struct AccessControlBuilder {
    directory: Arc<dyn Directory>,
    cache_store: Arc<dyn CacheStore>,
    policy: RolePolicy,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    role_invalidation: RoleInvalidation,
}

impl AccessControlBuilder {
    pub fn policy(mut self, policy: RolePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn role_invalidation(mut self, mode: RoleInvalidation) -> Self {
        self.role_invalidation = mode;
        self
    }

    pub fn build(self) -> AccessControl {
        let policy = Arc::new(self.policy);
        AccessControl {
            impersonation: ImpersonationManager::new(self.directory.clone(), self.audit, policy.clone()),
            cache: PermissionCache::new(self.cache_store),
            directory: self.directory,
            policy,
            notifier: self.notifier,
            role_invalidation: self.role_invalidation,
        }
    }
}

pub struct AccessControl {
    directory: Arc<dyn Directory>,
    cache: PermissionCache,
    policy: Arc<RolePolicy>,
    impersonation: ImpersonationManager,
    notifier: Arc<dyn Notifier>,
    role_invalidation: RoleInvalidation,
}

impl AccessControl {
    pub fn builder(directory: Arc<dyn Directory>, cache_store: Arc<dyn CacheStore>) -> AccessControlBuilder {
        AccessControlBuilder {
            directory,
            cache_store,
            policy: RolePolicy::default(),
            audit: Arc::new(NullAuditSink),
            notifier: Arc::new(NullNotifier),
            role_invalidation: RoleInvalidation::default(),
        }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    fn load_user(&self, id: UserId) -> Result<User, AccessError> {
        self.directory
            .user(id)?
            .ok_or_else(|| AccessError::not_found(NotFoundKind::User, id.to_string()))
    }

    fn load_role(&self, name: &RoleName) -> Result<Role, AccessError> {
        self.directory
            .role_by_name(name)?
            .ok_or_else(|| AccessError::not_found(NotFoundKind::Role, name.as_str()))
    }

    fn load_permission(&self, name: &PermissionName) -> Result<Permission, AccessError> {
        self.directory
            .permission_by_name(name)?
            .ok_or_else(|| AccessError::not_found(NotFoundKind::Permission, name.as_str()))
    }

    fn role_of(&self, user: &User) -> Result<Option<Role>, AccessError> {
        match user.role_id {
            Some(id) => Ok(self.directory.role(id)?),
            None => Ok(None),
        }
    }

    fn permissions_of(&self, user: &User) -> Result<PermissionSet, AccessError> {
        self.cache.resolve_with(user.id, || {
            effective_permissions(&*self.directory, user).map_err(AccessError::from)
        })
    }

    /// Evict and recompute after a committed change to `user`.
    ///
    /// The change is already persisted, so a cache failure is logged and the
    /// caller still gets the success outcome.
    fn refresh_after_commit(&self, user: UserId) {
        let refreshed = self.cache.refresh_with(user, || {
            let fresh = self.load_user(user)?;
            effective_permissions(&*self.directory, &fresh).map_err(AccessError::from)
        });
        if let Err(err) = refreshed {
            tracing::error!(%user, error = %err, "permission cache refresh failed after commit");
        }
    }

    fn resolve_actor(&self, user_id: UserId) -> Result<Actor, AccessError> {
        let user = self.load_user(user_id)?;
        let role = self.role_of(&user)?;
        let permissions = self.permissions_of(&user)?;

        let impersonation_scope = if permissions.contains(&PermissionName::ImpersonateUsers) {
            ImpersonationScope::from_grants(&self.directory.direct_grants(user.id)?)
        } else {
            ImpersonationScope::Subordinates
        };

        Ok(Actor {
            user_id: user.id,
            role,
            permissions,
            impersonation_scope,
        })
    }

    /// The actor privileged decisions are evaluated against.
    pub fn security_actor(&self, principal: &SecurityPrincipal) -> Result<Actor, AccessError> {
        self.resolve_actor(principal.user_id())
    }

    fn denied(&self, op: &'static str, actor: &Actor, denial: crate::Denial) -> AccessError {
        tracing::info!(op, actor_id = %actor.user_id, kind = ?denial.kind, reason = %denial.reason, "access denied");
        AccessError::PermissionDenied(denial)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role assignment
    // ─────────────────────────────────────────────────────────────────────────

    pub fn assign_role(
        &self,
        principal: &SecurityPrincipal,
        target_id: UserId,
        role_name: &RoleName,
    ) -> Result<Role, AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        let target = self.load_user(target_id)?;
        let role = self.load_role(role_name)?;

        self.policy
            .authorize_assign(&actor, target.id, &role)
            .map_err(|d| self.denied("assign_role", &actor, d))?;

        self.directory.set_user_role(target.id, role.id)?;
        self.refresh_after_commit(target.id);

        notify::notify_best_effort(
            &*self.notifier,
            RoleChanged {
                user_id: target.id,
                new_role_name: role.name.clone(),
                occurred_at: Utc::now(),
            },
        );

        tracing::info!(actor_id = %actor.user_id, target_id = %target.id, role = %role.name, "role assigned");
        Ok(role)
    }

    /// Reset `target_id` to the fallback role. Idempotent.
    pub fn revoke_role(&self, principal: &SecurityPrincipal, target_id: UserId) -> Result<Role, AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        let target = self.load_user(target_id)?;

        self.policy
            .authorize_revoke(&actor, target.id)
            .map_err(|d| self.denied("revoke_role", &actor, d))?;

        let fallback = self.load_role(&self.policy.fallback_role)?;
        if target.role_id == Some(fallback.id) {
            tracing::debug!(target_id = %target.id, role = %fallback.name, "user already holds fallback role");
            return Ok(fallback);
        }

        self.directory.set_user_role(target.id, fallback.id)?;
        self.refresh_after_commit(target.id);

        notify::notify_best_effort(
            &*self.notifier,
            RoleChanged {
                user_id: target.id,
                new_role_name: fallback.name.clone(),
                occurred_at: Utc::now(),
            },
        );

        tracing::info!(actor_id = %actor.user_id, target_id = %target.id, role = %fallback.name, "role revoked");
        Ok(fallback)
    }

    /// Roles `principal` may hand out.
    pub fn assignable_roles(&self, principal: &SecurityPrincipal) -> Result<Vec<Role>, AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        Ok(self.policy.assignable_roles(&actor, self.directory.roles()?))
    }

    /// Roles `principal` may see in listings and filters.
    pub fn visible_roles(&self, principal: &SecurityPrincipal) -> Result<Vec<Role>, AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        Ok(self.policy.visible_roles(&actor, self.directory.roles()?))
    }

    /// What the impersonated user's role picker would show. Display only.
    pub fn simulated_assignable_roles(&self, principal: &SessionPrincipal) -> Result<Vec<Role>, AccessError> {
        let as_seen = self.resolve_actor(principal.user_id())?;
        Ok(self.policy.assignable_roles(&as_seen, self.directory.roles()?))
    }

    /// What the impersonated user's role filters would show. Display only.
    pub fn simulated_visible_roles(&self, principal: &SessionPrincipal) -> Result<Vec<Role>, AccessError> {
        let as_seen = self.resolve_actor(principal.user_id())?;
        Ok(self.policy.visible_roles(&as_seen, self.directory.roles()?))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission grants
    // ─────────────────────────────────────────────────────────────────────────

    pub fn grant_permission(
        &self,
        principal: &SecurityPrincipal,
        target_id: UserId,
        permission: &PermissionName,
        meta: Option<PermissionMeta>,
    ) -> Result<(), AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        self.policy
            .authorize_permission_change(&actor)
            .map_err(|d| self.denied("grant_permission", &actor, d))?;

        let target = self.load_user(target_id)?;
        let permission = self.load_permission(permission)?;

        if meta.is_some() && permission.name != PermissionName::ImpersonateUsers {
            tracing::debug!(permission = %permission.name, "grant metadata stored but not interpreted");
        }

        self.directory.grant_user_permission(target.id, &permission.name, meta)?;
        self.refresh_after_commit(target.id);

        tracing::info!(actor_id = %actor.user_id, target_id = %target.id, permission = %permission.name, "permission granted");
        Ok(())
    }

    /// Remove a direct grant. Revoking a grant the user does not hold succeeds.
    pub fn revoke_permission(
        &self,
        principal: &SecurityPrincipal,
        target_id: UserId,
        permission: &PermissionName,
    ) -> Result<(), AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        self.policy
            .authorize_permission_change(&actor)
            .map_err(|d| self.denied("revoke_permission", &actor, d))?;

        let target = self.load_user(target_id)?;
        let permission = self.load_permission(permission)?;

        let removed = self.directory.revoke_user_permission(target.id, &permission.name)?;
        self.refresh_after_commit(target.id);

        tracing::info!(
            actor_id = %actor.user_id,
            target_id = %target.id,
            permission = %permission.name,
            removed,
            "permission revoked"
        );
        Ok(())
    }

    /// Replace a role's permission set.
    pub fn sync_role_permissions(
        &self,
        principal: &SecurityPrincipal,
        role_name: &RoleName,
        permissions: &[PermissionName],
    ) -> Result<(), AccessError> {
        let actor = self.resolve_actor(principal.user_id())?;
        self.policy
            .authorize_role_sync(&actor)
            .map_err(|d| self.denied("sync_role_permissions", &actor, d))?;

        let role = self.load_role(role_name)?;
        for permission in permissions {
            self.load_permission(permission)?;
        }

        self.directory.sync_role_permissions(role.id, permissions)?;

        match self.role_invalidation {
            RoleInvalidation::PerUser => {
                tracing::debug!(role = %role.name, "role holders keep cached permissions until their next per-user refresh");
            }
            RoleInvalidation::AllHolders => {
                match self.directory.users_with_role(role.id) {
                    Ok(holders) => match self.cache.invalidate_many(&holders) {
                        Ok(()) => {
                            tracing::debug!(role = %role.name, holders = holders.len(), "role holders' cached permissions invalidated");
                        }
                        Err(err) => {
                            tracing::error!(role = %role.name, error = %err, "failed to invalidate role holders' cached permissions");
                        }
                    },
                    Err(err) => {
                        tracing::error!(role = %role.name, error = %err, "failed to list role holders for cache invalidation");
                    }
                }
            }
        }

        tracing::info!(actor_id = %actor.user_id, role = %role.name, count = permissions.len(), "role permissions synced");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checks
    // ─────────────────────────────────────────────────────────────────────────

    pub fn has_permission(&self, user_id: UserId, permission: &PermissionName) -> Result<bool, AccessError> {
        let user = self.load_user(user_id)?;
        Ok(self.permissions_of(&user)?.contains(permission))
    }

    pub fn has_role(&self, user_id: UserId, role_name: &RoleName) -> Result<bool, AccessError> {
        let user = self.load_user(user_id)?;
        Ok(self.role_of(&user)?.is_some_and(|r| &r.name == role_name))
    }

    pub fn effective_permissions(&self, user_id: UserId) -> Result<PermissionSet, AccessError> {
        let user = self.load_user(user_id)?;
        self.permissions_of(&user)
    }

    pub fn flush_permission_cache(&self) -> Result<(), AccessError> {
        Ok(self.cache.flush()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Impersonation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn start_impersonation<S: SessionStore>(
        &self,
        session: &AuthSession<S>,
        target_id: UserId,
        request: &RequestMetadata,
    ) -> Result<User, AccessError> {
        let principal = session.security_principal().ok_or(AccessError::Unauthenticated)?;
        let actor = self.resolve_actor(principal.user_id())?;
        self.impersonation.start(session, &actor, target_id, request)
    }

    pub fn stop_impersonation<S: SessionStore>(
        &self,
        session: &AuthSession<S>,
        request: &RequestMetadata,
    ) -> Result<User, AccessError> {
        self.impersonation.stop(session, request)
    }

    pub fn is_impersonating<S: SessionStore>(&self, session: &AuthSession<S>) -> bool {
        session.is_impersonating()
    }
}
