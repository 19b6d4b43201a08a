//! Permission cache backends.
//!
//! The in-process store lives next to the [`CacheStore`](rolegate_auth::CacheStore)
//! trait; shared backends live here.

#[cfg(feature = "redis")]
pub mod redis_store;

#[cfg(feature = "redis")]
pub use redis_store::RedisCacheStore;
