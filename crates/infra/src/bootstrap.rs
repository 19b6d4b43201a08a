//! Wiring of [`AccessControl`] from [`AccessConfig`].

use std::sync::Arc;

use rolegate_auth::{AccessControl, AuditSink, CacheStore, Directory, InMemoryCacheStore, Notifier};

use crate::config::{AccessConfig, CacheBackend};

/// Open the configured cache backend.
pub fn cache_store(config: &AccessConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    match &config.cache_backend {
        CacheBackend::Memory => Ok(match config.cache_ttl {
            Some(ttl) => Arc::new(InMemoryCacheStore::with_ttl(ttl)),
            None => Arc::new(InMemoryCacheStore::new()),
        }),
        #[cfg(feature = "redis")]
        CacheBackend::Redis { url } => {
            let mut store = crate::cache::RedisCacheStore::new(url, "rolegate:")?;
            if let Some(ttl) = config.cache_ttl {
                store = store.with_ttl(ttl);
            }
            tracing::info!(%url, "using redis permission cache");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis { .. } => {
            anyhow::bail!("ROLEGATE_CACHE_BACKEND=redis requires the `redis` feature")
        }
    }
}

pub fn build_access_control(
    config: &AccessConfig,
    directory: Arc<dyn Directory>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<AccessControl> {
    let cache = cache_store(config)?;

    tracing::info!(
        top_role = %config.top_role,
        fallback_role = %config.fallback_role,
        ttl_secs = config.cache_ttl.map(|t| t.as_secs()),
        role_invalidation = ?config.role_invalidation,
        "access control configured"
    );

    Ok(AccessControl::builder(directory, cache)
        .policy(config.role_policy())
        .audit(audit)
        .notifier(notifier)
        .role_invalidation(config.role_invalidation)
        .build())
}

#[cfg(test)]
mod tests {
    use rolegate_auth::{NullAuditSink, NullNotifier};

    use super::*;
    use crate::InMemoryDirectory;

    #[test]
    fn memory_backend_builds() {
        let directory = Arc::new(InMemoryDirectory::seeded().unwrap());
        let access = build_access_control(
            &AccessConfig::default(),
            directory,
            Arc::new(NullAuditSink),
            Arc::new(NullNotifier),
        )
        .unwrap();
        assert_eq!(access.policy().top_role.as_str(), "super_user");
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn redis_backend_requires_feature() {
        let config = AccessConfig {
            cache_backend: CacheBackend::Redis {
                url: "redis://localhost:6379".into(),
            },
            ..AccessConfig::default()
        };
        assert!(cache_store(&config).is_err());
    }
}
