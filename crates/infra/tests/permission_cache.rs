mod common;

use std::sync::Arc;
use std::time::Duration;

use rolegate_auth::{
    AccessControl, BusNotifier, CacheError, CacheStore, Directory, InMemoryCacheStore, PermissionCache,
    PermissionName, RoleChanged, RoleInvalidation, RoleName, User,
};
use rolegate_events::{EventBus, InMemoryEventBus};
use rolegate_infra::InMemoryDirectory;

use common::{Fixture, principal};

/// A cache backend that is always down.
struct DownStore;

impl CacheStore for DownStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<String>>, CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }
    fn put(&self, _key: &str, _value: Vec<String>) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }
    fn forget(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }
    fn flush(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }
}

#[test]
fn first_check_populates_cache() {
    let fx = Fixture::new();
    let viewer = fx.user("Vera", Some(RoleName::Viewer));
    let key = PermissionCache::key(viewer.id);

    assert_eq!(key, format!("user_permissions_{}", viewer.id));
    assert!(fx.cache.get(&key).unwrap().is_none());

    assert!(fx.access.has_permission(viewer.id, &PermissionName::ViewUsers).unwrap());

    assert_eq!(fx.cache.get(&key).unwrap(), Some(vec!["view_users".to_string()]));
}

#[test]
fn per_user_mode_keeps_role_holders_stale() {
    let fx = Fixture::new();
    let root = fx.user("Root", Some(RoleName::SuperUser));
    let seller = fx.user("Sue", Some(RoleName::Seller));

    assert!(!fx.access.has_permission(seller.id, &PermissionName::ManageUsers).unwrap());

    fx.access
        .sync_role_permissions(
            &principal(&root),
            &RoleName::Seller,
            &[PermissionName::ViewUsers, PermissionName::ManageUsers],
        )
        .unwrap();

    // Cached set survives the role-level change until a per-user eviction.
    assert!(!fx.access.has_permission(seller.id, &PermissionName::ManageUsers).unwrap());

    fx.access.flush_permission_cache().unwrap();
    assert!(fx.access.has_permission(seller.id, &PermissionName::ManageUsers).unwrap());
}

#[test]
fn all_holders_mode_evicts_every_role_holder() {
    let fx = Fixture::with(|b| b.role_invalidation(RoleInvalidation::AllHolders));
    let root = fx.user("Root", Some(RoleName::SuperUser));
    let sue = fx.user("Sue", Some(RoleName::Seller));
    let sam = fx.user("Sam", Some(RoleName::Seller));
    let vera = fx.user("Vera", Some(RoleName::Viewer));

    for user in [&sue, &sam, &vera] {
        fx.access.effective_permissions(user.id).unwrap();
    }

    fx.access
        .sync_role_permissions(
            &principal(&root),
            &RoleName::Seller,
            &[PermissionName::ViewUsers, PermissionName::ManageUsers],
        )
        .unwrap();

    assert!(fx.cache.get(&PermissionCache::key(sue.id)).unwrap().is_none());
    assert!(fx.cache.get(&PermissionCache::key(sam.id)).unwrap().is_none());
    assert!(fx.cache.get(&PermissionCache::key(vera.id)).unwrap().is_some());

    assert!(fx.access.has_permission(sue.id, &PermissionName::ManageUsers).unwrap());
    assert!(fx.access.has_permission(sam.id, &PermissionName::ManageUsers).unwrap());
}

#[test]
fn effective_set_is_role_union_direct_without_duplicates() {
    let fx = Fixture::new();
    let admin = fx.user("Alice", Some(RoleName::Admin));
    let viewer = fx.user("Vera", Some(RoleName::Viewer));

    fx.access
        .grant_permission(&principal(&admin), viewer.id, &PermissionName::ViewUsers, None)
        .unwrap();
    fx.access
        .grant_permission(&principal(&admin), viewer.id, &PermissionName::ImpersonateUsers, None)
        .unwrap();

    let set = fx.access.effective_permissions(viewer.id).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&PermissionName::ViewUsers));
    assert!(set.contains(&PermissionName::ImpersonateUsers));
}

fn down_cache_access() -> (Arc<InMemoryDirectory>, AccessControl) {
    let (directory, access, _bus) = down_cache_access_with_bus(RoleInvalidation::PerUser);
    (directory, access)
}

fn down_cache_access_with_bus(
    mode: RoleInvalidation,
) -> (Arc<InMemoryDirectory>, AccessControl, Arc<InMemoryEventBus<RoleChanged>>) {
    let directory = Arc::new(InMemoryDirectory::seeded().unwrap());
    let bus: Arc<InMemoryEventBus<RoleChanged>> = Arc::new(InMemoryEventBus::new());
    let access = AccessControl::builder(directory.clone(), Arc::new(DownStore))
        .notifier(Arc::new(BusNotifier::new(bus.clone())))
        .role_invalidation(mode)
        .build();
    (directory, access, bus)
}

fn insert_user(directory: &InMemoryDirectory, name: &str, role: Option<RoleName>) -> User {
    let mut user = User::new(name, format!("{}@example.com", name.to_lowercase()));
    if let Some(role) = role {
        user = user.with_role(directory.role_by_name(&role).unwrap().unwrap().id);
    }
    directory.insert_user(user).unwrap()
}

#[test]
fn unavailable_cache_is_bypassed_for_reads() {
    let (directory, access) = down_cache_access();
    let viewer = insert_user(&directory, "Vera", Some(RoleName::Viewer));

    assert!(access.has_permission(viewer.id, &PermissionName::ViewUsers).unwrap());
    assert!(!access.has_permission(viewer.id, &PermissionName::ManageUsers).unwrap());
}

#[test]
fn committed_assignment_survives_cache_failure_and_still_broadcasts() {
    let (directory, access, bus) = down_cache_access_with_bus(RoleInvalidation::PerUser);
    let sub = bus.subscribe();
    let root = insert_user(&directory, "Root", Some(RoleName::SuperUser));
    let target = insert_user(&directory, "Bob", None);

    let role = access
        .assign_role(&principal(&root), target.id, &RoleName::Viewer)
        .unwrap();

    assert_eq!(role.name, RoleName::Viewer);
    assert!(access.has_role(target.id, &RoleName::Viewer).unwrap());
    assert!(access.has_permission(target.id, &PermissionName::ViewUsers).unwrap());

    let events = sub.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, target.id);
    assert_eq!(events[0].new_role_name, RoleName::Viewer);
}

#[test]
fn committed_grants_and_syncs_survive_cache_failure() {
    let (directory, access, _bus) = down_cache_access_with_bus(RoleInvalidation::AllHolders);
    let root = insert_user(&directory, "Root", Some(RoleName::SuperUser));
    let seller = insert_user(&directory, "Sue", Some(RoleName::Seller));

    access
        .grant_permission(&principal(&root), seller.id, &PermissionName::ImpersonateUsers, None)
        .unwrap();
    access
        .sync_role_permissions(&principal(&root), &RoleName::Seller, &[PermissionName::ManageUsers])
        .unwrap();

    let set = access.effective_permissions(seller.id).unwrap();
    assert!(set.contains(&PermissionName::ImpersonateUsers));
    assert!(set.contains(&PermissionName::ManageUsers));
    assert!(!set.contains(&PermissionName::ViewUsers));

    assert!(access.revoke_role(&principal(&root), seller.id).is_ok());
    assert!(access.has_role(seller.id, &RoleName::Visitor).unwrap());
}

#[test]
fn ttl_store_expires_entries() {
    let store = InMemoryCacheStore::with_ttl(Duration::from_millis(10));
    store.put("user_permissions_x", vec!["view_users".into()]).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert!(store.get("user_permissions_x").unwrap().is_none());
}
