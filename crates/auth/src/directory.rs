//! Persistent store contract for roles, permissions and their assignments.

use std::sync::Arc;

use rolegate_core::{RoleId, StoreResult, UserId};

use crate::{DirectGrant, Permission, PermissionMeta, PermissionName, PermissionSet, Role, RoleName, User};

/// Read/write access to users, roles, permissions and the pivots between them.
///
/// Set-style writes (`set_user_role`, `sync_role_permissions`,
/// `grant_user_permission`) replace or add in one step; readers never observe
/// a partially applied sync.
pub trait Directory: Send + Sync {
    fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    fn role(&self, id: RoleId) -> StoreResult<Option<Role>>;

    fn role_by_name(&self, name: &RoleName) -> StoreResult<Option<Role>>;

    fn roles(&self) -> StoreResult<Vec<Role>>;

    fn permission_by_name(&self, name: &PermissionName) -> StoreResult<Option<Permission>>;

    /// Names of the permissions granted to a role.
    fn role_permissions(&self, role: RoleId) -> StoreResult<Vec<PermissionName>>;

    /// Permissions granted directly to a user, with their pivot metadata.
    fn direct_grants(&self, user: UserId) -> StoreResult<Vec<DirectGrant>>;

    fn users_with_role(&self, role: RoleId) -> StoreResult<Vec<UserId>>;

    /// Replace the user's role.
    fn set_user_role(&self, user: UserId, role: RoleId) -> StoreResult<()>;

    /// Replace the role's permission set with exactly `permissions`.
    fn sync_role_permissions(&self, role: RoleId, permissions: &[PermissionName]) -> StoreResult<()>;

    /// Add a direct grant, or replace its metadata if already granted.
    fn grant_user_permission(
        &self,
        user: UserId,
        permission: &PermissionName,
        meta: Option<PermissionMeta>,
    ) -> StoreResult<()>;

    /// Remove a direct grant. Returns whether a grant was removed.
    fn revoke_user_permission(&self, user: UserId, permission: &PermissionName) -> StoreResult<bool>;
}

impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        (**self).user(id)
    }

    fn role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        (**self).role(id)
    }

    fn role_by_name(&self, name: &RoleName) -> StoreResult<Option<Role>> {
        (**self).role_by_name(name)
    }

    fn roles(&self) -> StoreResult<Vec<Role>> {
        (**self).roles()
    }

    fn permission_by_name(&self, name: &PermissionName) -> StoreResult<Option<Permission>> {
        (**self).permission_by_name(name)
    }

    fn role_permissions(&self, role: RoleId) -> StoreResult<Vec<PermissionName>> {
        (**self).role_permissions(role)
    }

    fn direct_grants(&self, user: UserId) -> StoreResult<Vec<DirectGrant>> {
        (**self).direct_grants(user)
    }

    fn users_with_role(&self, role: RoleId) -> StoreResult<Vec<UserId>> {
        (**self).users_with_role(role)
    }

    fn set_user_role(&self, user: UserId, role: RoleId) -> StoreResult<()> {
        (**self).set_user_role(user, role)
    }

    fn sync_role_permissions(&self, role: RoleId, permissions: &[PermissionName]) -> StoreResult<()> {
        (**self).sync_role_permissions(role, permissions)
    }

    fn grant_user_permission(
        &self,
        user: UserId,
        permission: &PermissionName,
        meta: Option<PermissionMeta>,
    ) -> StoreResult<()> {
        (**self).grant_user_permission(user, permission, meta)
    }

    fn revoke_user_permission(&self, user: UserId, permission: &PermissionName) -> StoreResult<bool> {
        (**self).revoke_user_permission(user, permission)
    }
}

/// Role permissions ∪ direct permissions, read straight from the store.
pub fn effective_permissions(directory: &dyn Directory, user: &User) -> StoreResult<PermissionSet> {
    let mut set = PermissionSet::new();

    if let Some(role_id) = user.role_id {
        set.extend(directory.role_permissions(role_id)?);
    }

    set.extend(directory.direct_grants(user.id)?.into_iter().map(|g| g.permission));

    Ok(set)
}
