//! Deployment configuration read from the environment.
//!
//! | Variable                     | Default                  |
//! |------------------------------|--------------------------|
//! | `ROLEGATE_TOP_ROLE`          | `super_user`             |
//! | `ROLEGATE_FALLBACK_ROLE`     | `visitor`                |
//! | `ROLEGATE_CACHE_TTL_SECS`    | unset / `0` = forever    |
//! | `ROLEGATE_CACHE_BACKEND`     | `memory` (or `redis`)    |
//! | `REDIS_URL`                  | `redis://localhost:6379` |
//! | `ROLEGATE_ROLE_INVALIDATION` | `per_user` (or `all_holders`) |
//! | `ROLEGATE_LOCALE`            | `en` (or `pt_br`)        |
//!
//! Invalid values are logged and replaced by the default; configuration never
//! prevents startup.

use std::time::Duration;

use rolegate_auth::{Locale, RoleInvalidation, RoleName, RolePolicy};

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub top_role: RoleName,
    pub fallback_role: RoleName,
    pub cache_ttl: Option<Duration>,
    pub cache_backend: CacheBackend,
    pub role_invalidation: RoleInvalidation,
    pub locale: Locale,
}

impl Default for AccessConfig {
    fn default() -> Self {
        let policy = RolePolicy::default();
        Self {
            top_role: policy.top_role,
            fallback_role: policy.fallback_role,
            cache_ttl: None,
            cache_backend: CacheBackend::Memory,
            role_invalidation: RoleInvalidation::default(),
            locale: policy.locale,
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (env, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let top_role = value("ROLEGATE_TOP_ROLE").map(RoleName::from).unwrap_or(defaults.top_role);
        let fallback_role = value("ROLEGATE_FALLBACK_ROLE")
            .map(RoleName::from)
            .unwrap_or(defaults.fallback_role);

        let cache_ttl = value("ROLEGATE_CACHE_TTL_SECS").and_then(|raw| match raw.parse::<u64>() {
            Ok(0) => None,
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                tracing::warn!(value = %raw, "ROLEGATE_CACHE_TTL_SECS is not a number; caching forever");
                None
            }
        });

        let cache_backend = match value("ROLEGATE_CACHE_BACKEND").as_deref() {
            None | Some("memory") => CacheBackend::Memory,
            Some("redis") => CacheBackend::Redis {
                url: value("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
            Some(other) => {
                tracing::warn!(value = other, "unknown ROLEGATE_CACHE_BACKEND; using in-memory cache");
                CacheBackend::Memory
            }
        };

        let role_invalidation = match value("ROLEGATE_ROLE_INVALIDATION").as_deref() {
            None | Some("per_user") => RoleInvalidation::PerUser,
            Some("all_holders") => RoleInvalidation::AllHolders,
            Some(other) => {
                tracing::warn!(value = other, "unknown ROLEGATE_ROLE_INVALIDATION; using per_user");
                RoleInvalidation::PerUser
            }
        };

        let locale = match value("ROLEGATE_LOCALE") {
            None => defaults.locale,
            Some(tag) => Locale::parse(&tag).unwrap_or_else(|| {
                tracing::warn!(value = %tag, "unsupported ROLEGATE_LOCALE; using en");
                Locale::En
            }),
        };

        if top_role == fallback_role {
            tracing::warn!(role = %top_role, "top role and fallback role are the same");
        }

        Self {
            top_role,
            fallback_role,
            cache_ttl,
            cache_backend,
            role_invalidation,
            locale,
        }
    }

    pub fn role_policy(&self) -> RolePolicy {
        RolePolicy {
            top_role: self.top_role.clone(),
            fallback_role: self.fallback_role.clone(),
            locale: self.locale,
            ..RolePolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> AccessConfig {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AccessConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config(&[]), AccessConfig::default());
    }

    #[test]
    fn reads_every_setting() {
        let cfg = config(&[
            ("ROLEGATE_TOP_ROLE", "root"),
            ("ROLEGATE_FALLBACK_ROLE", "guest"),
            ("ROLEGATE_CACHE_TTL_SECS", "300"),
            ("ROLEGATE_CACHE_BACKEND", "redis"),
            ("REDIS_URL", "redis://cache:6379"),
            ("ROLEGATE_ROLE_INVALIDATION", "all_holders"),
            ("ROLEGATE_LOCALE", "pt-BR"),
        ]);

        assert_eq!(cfg.top_role, RoleName::from("root"));
        assert_eq!(cfg.fallback_role, RoleName::from("guest"));
        assert_eq!(cfg.cache_ttl, Some(Duration::from_secs(300)));
        assert_eq!(
            cfg.cache_backend,
            CacheBackend::Redis {
                url: "redis://cache:6379".into()
            }
        );
        assert_eq!(cfg.role_invalidation, RoleInvalidation::AllHolders);
        assert_eq!(cfg.locale, Locale::PtBr);
    }

    #[test]
    fn zero_ttl_means_forever() {
        assert_eq!(config(&[("ROLEGATE_CACHE_TTL_SECS", "0")]).cache_ttl, None);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(&[
            ("ROLEGATE_CACHE_TTL_SECS", "soon"),
            ("ROLEGATE_CACHE_BACKEND", "memcached"),
            ("ROLEGATE_ROLE_INVALIDATION", "sometimes"),
            ("ROLEGATE_LOCALE", "klingon"),
        ]);
        assert_eq!(cfg, AccessConfig::default());
    }

    #[test]
    fn role_policy_keeps_team_restrictions() {
        let policy = config(&[("ROLEGATE_TOP_ROLE", "root")]).role_policy();
        assert_eq!(policy.top_role, RoleName::from("root"));
        assert_eq!(policy.team_restrictions, RolePolicy::default().team_restrictions);
    }
}
