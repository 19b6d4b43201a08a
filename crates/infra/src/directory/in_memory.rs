use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rolegate_auth::{
    DirectGrant, Directory, Permission, PermissionMeta, PermissionName, Role, RoleName, User,
};
use rolegate_core::{RoleId, StoreError, StoreResult, UserId};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionName, Permission>,
    role_permissions: HashMap<RoleId, BTreeSet<PermissionName>>,
    user_permissions: HashMap<UserId, BTreeMap<PermissionName, Option<PermissionMeta>>>,
}

impl State {
    fn ensure_user(&self, id: UserId) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found(format!("user {id}")))
        }
    }

    fn ensure_permission(&self, name: &PermissionName) -> StoreResult<()> {
        if self.permissions.contains_key(name) {
            Ok(())
        } else {
            Err(StoreError::not_found(format!("permission {name}")))
        }
    }
}

/// In-memory directory for tests/dev.
///
/// Each write takes the lock once, so set-syncs are never half-visible.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

/// `(name, label, priority, permissions)` of the stock role catalogue.
const DEFAULT_ROLES: &[(&str, &str, u32, &[&str])] = &[
    (
        "super_user",
        "Super User",
        100,
        &["assign_roles", "manage_users", "manage_roles", "impersonate_users", "view_users"],
    ),
    (
        "admin",
        "Administrator",
        90,
        &["assign_roles", "manage_users", "impersonate_users", "view_users"],
    ),
    ("manager", "Manager", 70, &["assign_roles", "view_users"]),
    ("sales_manager", "Sales Manager", 60, &["assign_roles", "view_users"]),
    ("seller", "Seller", 40, &["view_users"]),
    ("viewer", "Viewer", 20, &["view_users"]),
    ("visitor", "Visitor", 0, &[]),
];

const DEFAULT_PERMISSIONS: &[(&str, &str)] = &[
    ("assign_roles", "Assign roles"),
    ("manage_users", "Manage users"),
    ("manage_roles", "Manage roles"),
    ("impersonate_users", "Impersonate users"),
    ("view_users", "View users"),
];

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory holding the stock roles and permissions.
    pub fn seeded() -> StoreResult<Self> {
        let directory = Self::new();
        directory.seed_defaults()?;
        Ok(directory)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::unavailable("directory lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::unavailable("directory lock poisoned"))
    }

    pub fn seed_defaults(&self) -> StoreResult<()> {
        for (name, label) in DEFAULT_PERMISSIONS {
            self.insert_permission(Permission::new(*name, *label))?;
        }
        for (name, label, priority, permissions) in DEFAULT_ROLES {
            let role = self.insert_role(Role::new(*name, *label, *priority))?;
            let permissions: Vec<PermissionName> =
                permissions.iter().map(|p| PermissionName::from(*p)).collect();
            self.sync_role_permissions(role.id, &permissions)?;
        }
        tracing::debug!(
            roles = DEFAULT_ROLES.len(),
            permissions = DEFAULT_PERMISSIONS.len(),
            "directory seeded"
        );
        Ok(())
    }

    pub fn insert_role(&self, role: Role) -> StoreResult<Role> {
        let mut state = self.write()?;
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::conflict(format!("role name '{}' already exists", role.name)));
        }
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    pub fn insert_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let mut state = self.write()?;
        if state.permissions.contains_key(&permission.name) {
            return Err(StoreError::conflict(format!(
                "permission name '{}' already exists",
                permission.name
            )));
        }
        state.permissions.insert(permission.name.clone(), permission.clone());
        Ok(permission)
    }

    pub fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.write()?;
        if let Some(role_id) = user.role_id {
            if !state.roles.contains_key(&role_id) {
                return Err(StoreError::not_found(format!("role {role_id}")));
            }
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Flip the active flag; the row and its role are kept.
    pub fn set_active(&self, user: UserId, is_active: bool) -> StoreResult<()> {
        let mut state = self.write()?;
        let row = state
            .users
            .get_mut(&user)
            .ok_or_else(|| StoreError::not_found(format!("user {user}")))?;
        row.is_active = is_active;
        Ok(())
    }

    /// Delete a user and their direct grants. Returns whether the user existed.
    pub fn remove_user(&self, user: UserId) -> StoreResult<bool> {
        let mut state = self.write()?;
        state.user_permissions.remove(&user);
        Ok(state.users.remove(&user).is_some())
    }

    /// Delete a role nobody references.
    pub fn remove_role(&self, role: RoleId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.role_id == Some(role)) {
            return Err(StoreError::conflict(format!("role {role} is still assigned")));
        }
        state.role_permissions.remove(&role);
        Ok(state.roles.remove(&role).is_some())
    }
}

impl Directory for InMemoryDirectory {
    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    fn role_by_name(&self, name: &RoleName) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.values().find(|r| &r.name == name).cloned())
    }

    fn roles(&self) -> StoreResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.read()?.roles.values().cloned().collect();
        roles.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(roles)
    }

    fn permission_by_name(&self, name: &PermissionName) -> StoreResult<Option<Permission>> {
        Ok(self.read()?.permissions.get(name).cloned())
    }

    fn role_permissions(&self, role: RoleId) -> StoreResult<Vec<PermissionName>> {
        Ok(self
            .read()?
            .role_permissions
            .get(&role)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn direct_grants(&self, user: UserId) -> StoreResult<Vec<DirectGrant>> {
        Ok(self
            .read()?
            .user_permissions
            .get(&user)
            .map(|grants| {
                grants
                    .iter()
                    .map(|(permission, meta)| DirectGrant {
                        permission: permission.clone(),
                        meta: meta.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn users_with_role(&self, role: RoleId) -> StoreResult<Vec<UserId>> {
        Ok(self
            .read()?
            .users
            .values()
            .filter(|u| u.role_id == Some(role))
            .map(|u| u.id)
            .collect())
    }

    fn set_user_role(&self, user: UserId, role: RoleId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.roles.contains_key(&role) {
            return Err(StoreError::not_found(format!("role {role}")));
        }
        let row = state
            .users
            .get_mut(&user)
            .ok_or_else(|| StoreError::not_found(format!("user {user}")))?;
        row.role_id = Some(role);
        Ok(())
    }

    fn sync_role_permissions(&self, role: RoleId, permissions: &[PermissionName]) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.roles.contains_key(&role) {
            return Err(StoreError::not_found(format!("role {role}")));
        }
        for permission in permissions {
            state.ensure_permission(permission)?;
        }
        state
            .role_permissions
            .insert(role, permissions.iter().cloned().collect());
        Ok(())
    }

    fn grant_user_permission(
        &self,
        user: UserId,
        permission: &PermissionName,
        meta: Option<PermissionMeta>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        state.ensure_user(user)?;
        state.ensure_permission(permission)?;
        state
            .user_permissions
            .entry(user)
            .or_default()
            .insert(permission.clone(), meta);
        Ok(())
    }

    fn revoke_user_permission(&self, user: UserId, permission: &PermissionName) -> StoreResult<bool> {
        let mut state = self.write()?;
        state.ensure_user(user)?;
        Ok(state
            .user_permissions
            .get_mut(&user)
            .is_some_and(|grants| grants.remove(permission).is_some()))
    }
}
