//! Permission resolution cache.
//!
//! Memoizes each user's effective permission set under a string key. The
//! store behind it is pluggable (in-process map, Redis); the cache itself is
//! only an optimization, so a failing store is bypassed rather than trusted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rolegate_core::UserId;

use crate::PermissionSet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache entry is corrupt: {0}")]
    Corrupt(String),
}

/// Key/value backend for cached permission lists.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError>;

    fn put(&self, key: &str, value: Vec<String>) -> Result<(), CacheError>;

    /// Remove one entry. Returns whether it existed.
    fn forget(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every entry owned by this cache.
    fn flush(&self) -> Result<(), CacheError>;
}

impl<S> CacheStore for Arc<S>
where
    S: CacheStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: Vec<String>) -> Result<(), CacheError> {
        (**self).put(key, value)
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        (**self).forget(key)
    }

    fn flush(&self) -> Result<(), CacheError> {
        (**self).flush()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local cache store.
///
/// Entries live forever unless a TTL is configured.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        let now = Instant::now();
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| CacheError::Unavailable("cache lock poisoned".into()))?;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a concurrent put already replaced it.
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".into()))?;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, value: Vec<String>) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".into()))?;

        let now = Instant::now();
        if self.ttl.is_some() {
            entries.retain(|_, entry| !entry.is_expired(now));
        }
        let expires_at = self.ttl.map(|ttl| now + ttl);
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".into()))?;
        Ok(entries.remove(key).is_some())
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".into()))?;
        entries.clear();
        Ok(())
    }
}

/// What happens to cached entries when a role's permission set is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleInvalidation {
    /// Only per-user mutations evict; holders of the role keep their cached
    /// set until their own entry is evicted or the cache is flushed.
    #[default]
    PerUser,
    /// Evict every user currently holding the role.
    AllHolders,
}

/// Per-user memo of effective permission sets.
#[derive(Clone)]
pub struct PermissionCache {
    store: Arc<dyn CacheStore>,
}

impl core::fmt::Debug for PermissionCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PermissionCache").finish_non_exhaustive()
    }
}

impl PermissionCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn key(user: UserId) -> String {
        format!("user_permissions_{user}")
    }

    /// Return the cached set, or compute, store and return it.
    ///
    /// A store failure on read bypasses the cache entirely; `compute` is the
    /// source of truth and its errors are returned unchanged.
    pub fn resolve_with<E, F>(&self, user: UserId, compute: F) -> Result<PermissionSet, E>
    where
        F: FnOnce() -> Result<PermissionSet, E>,
    {
        let key = Self::key(user);

        match self.store.get(&key) {
            Ok(Some(names)) => return Ok(PermissionSet::from_names(names)),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(%user, error = %err, "permission cache unavailable; resolving from store");
                return compute();
            }
        }

        let fresh = compute()?;
        if let Err(err) = self.store.put(&key, fresh.names()) {
            tracing::warn!(%user, error = %err, "failed to populate permission cache");
        }
        Ok(fresh)
    }

    /// Drop the cached entry for `user`.
    pub fn invalidate(&self, user: UserId) -> Result<(), CacheError> {
        let existed = self.store.forget(&Self::key(user))?;
        tracing::debug!(%user, existed, "permission cache entry invalidated");
        Ok(())
    }

    /// Invalidate and eagerly repopulate after a committed mutation.
    ///
    /// Fails only when the stale entry could be neither removed nor
    /// overwritten, i.e. when a later `resolve_with` could still observe it.
    pub fn refresh_with<E, F>(&self, user: UserId, compute: F) -> Result<PermissionSet, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> Result<PermissionSet, E>,
    {
        let invalidated = self.invalidate(user);
        let fresh = compute()?;

        match (self.store.put(&Self::key(user), fresh.names()), invalidated) {
            (Ok(()), _) => Ok(fresh),
            (Err(err), Ok(())) => {
                tracing::warn!(%user, error = %err, "failed to repopulate permission cache");
                Ok(fresh)
            }
            (Err(put_err), Err(forget_err)) => {
                tracing::error!(
                    %user,
                    forget_error = %forget_err,
                    put_error = %put_err,
                    "stale permission cache entry could not be evicted"
                );
                Err(E::from(forget_err))
            }
        }
    }

    /// Invalidate several users, attempting all of them before reporting the
    /// first failure.
    pub fn invalidate_many(&self, users: &[UserId]) -> Result<(), CacheError> {
        let mut first_err = None;
        for user in users {
            if let Err(err) = self.invalidate(*user) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Clear every cached entry.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.store.flush()?;
        tracing::info!("permission cache flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::PermissionName;

    struct DownStore;

    impl CacheStore for DownStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<String>>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        fn put(&self, _key: &str, _value: Vec<String>) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        fn forget(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        fn flush(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    fn set(names: &[&str]) -> PermissionSet {
        PermissionSet::from_names(names.iter().copied())
    }

    #[test]
    fn second_resolve_is_served_from_cache() {
        let cache = PermissionCache::new(Arc::new(InMemoryCacheStore::new()));
        let user = UserId::new();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let resolved = cache
                .resolve_with(user, || {
                    calls.set(calls.get() + 1);
                    Ok::<_, CacheError>(set(&["view_users"]))
                })
                .unwrap();
            assert!(resolved.contains(&PermissionName::ViewUsers));
        }

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn resolve_after_invalidate_recomputes() {
        let cache = PermissionCache::new(Arc::new(InMemoryCacheStore::new()));
        let user = UserId::new();

        cache.resolve_with(user, || Ok::<_, CacheError>(set(&["view_users"]))).unwrap();
        cache.invalidate(user).unwrap();

        let resolved = cache.resolve_with(user, || Ok::<_, CacheError>(set(&["assign_roles"]))).unwrap();
        assert!(resolved.contains(&PermissionName::AssignRoles));
        assert!(!resolved.contains(&PermissionName::ViewUsers));
    }

    #[test]
    fn refresh_overwrites_previous_entry() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = PermissionCache::new(store.clone());
        let user = UserId::new();

        cache.resolve_with(user, || Ok::<_, CacheError>(set(&["view_users"]))).unwrap();
        cache.refresh_with(user, || Ok::<_, CacheError>(set(&["manage_users"]))).unwrap();

        assert_eq!(
            store.get(&PermissionCache::key(user)).unwrap(),
            Some(vec!["manage_users".to_string()])
        );
    }

    #[test]
    fn unavailable_store_falls_back_to_computation() {
        let cache = PermissionCache::new(Arc::new(DownStore));
        let user = UserId::new();

        let resolved = cache
            .resolve_with(user, || Ok::<_, CacheError>(set(&["impersonate_users"])))
            .unwrap();

        assert!(resolved.contains(&PermissionName::ImpersonateUsers));
    }

    #[test]
    fn refresh_reports_when_stale_entry_cannot_be_evicted() {
        let cache = PermissionCache::new(Arc::new(DownStore));
        let err = cache
            .refresh_with(UserId::new(), || Ok::<_, CacheError>(set(&[])))
            .unwrap_err();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }

    #[test]
    fn expired_entries_are_misses() {
        let store = InMemoryCacheStore::with_ttl(Duration::ZERO);
        store.put("k", vec!["view_users".into()]).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn put_sweeps_expired_entries() {
        let store = InMemoryCacheStore::with_ttl(Duration::ZERO);
        store.put("a", vec!["view_users".into()]).unwrap();
        store.put("b", vec!["view_users".into()]).unwrap();
        store.put("c", vec!["view_users".into()]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn flush_empties_the_store() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = PermissionCache::new(store.clone());
        cache.resolve_with(UserId::new(), || Ok::<_, CacheError>(set(&["a"]))).unwrap();
        cache.resolve_with(UserId::new(), || Ok::<_, CacheError>(set(&["b"]))).unwrap();
        assert_eq!(store.len(), 2);

        cache.flush().unwrap();
        assert!(store.is_empty());
    }
}
