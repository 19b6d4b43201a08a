//! Redis-backed permission cache (optional).
//!
//! Entries are JSON string arrays under `{prefix}{key}`. Shared between
//! processes, so an eviction in one node is seen by all of them.

use std::time::Duration;

use rolegate_auth::{CacheError, CacheStore};

#[derive(Debug, Clone)]
pub struct RedisCacheStore {
    client: redis::Client,
    prefix: String,
    ttl: Option<Duration>,
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

/// `EX` argument for `ttl`: whole seconds, rounded up, at least one.
fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_millis().div_ceil(1000).max(1);
    u64::try_from(secs).unwrap_or(u64::MAX)
}

impl RedisCacheStore {
    pub fn new(redis_url: impl AsRef<str>, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(unavailable)?;
        Ok(Self {
            client,
            prefix: prefix.into(),
            ttl: None,
        })
    }

    /// Expire entries after `ttl`, rounded up to whole seconds.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn connection(&self) -> Result<redis::Connection, CacheError> {
        self.client.get_connection().map_err(unavailable)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl CacheStore for RedisCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        let mut conn = self.connection()?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.full_key(key))
            .query(&mut conn)
            .map_err(unavailable)?;

        raw.map(|payload| {
            serde_json::from_str::<Vec<String>>(&payload).map_err(|e| CacheError::Corrupt(e.to_string()))
        })
        .transpose()
    }

    fn put(&self, key: &str, value: Vec<String>) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&value).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let mut conn = self.connection()?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(self.full_key(key)).arg(payload);
        if let Some(ttl) = self.ttl {
            cmd.arg("EX").arg(expiry_secs(ttl));
        }
        let _: () = cmd.query(&mut conn).map_err(unavailable)?;
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection()?;
        let removed: i64 = redis::cmd("DEL")
            .arg(self.full_key(key))
            .query(&mut conn)
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    /// Remove every key under this store's prefix.
    fn flush(&self) -> Result<(), CacheError> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}*", self.prefix))
            .query(&mut conn)
            .map_err(unavailable)?;

        if keys.is_empty() {
            return Ok(());
        }

        let removed: i64 = redis::cmd("DEL").arg(&keys).query(&mut conn).map_err(unavailable)?;
        tracing::debug!(prefix = %self.prefix, removed, "permission cache flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_rounds_up_to_whole_seconds() {
        assert_eq!(expiry_secs(Duration::from_millis(1)), 1);
        assert_eq!(expiry_secs(Duration::from_millis(1500)), 2);
        assert_eq!(expiry_secs(Duration::from_secs(300)), 300);
        assert_eq!(expiry_secs(Duration::ZERO), 1);
    }
}
