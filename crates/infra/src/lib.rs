//! Infrastructure layer: store and cache adapters, audit sinks, config and
//! service wiring.

pub mod audit;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod directory;

pub use bootstrap::{build_access_control, cache_store};
pub use config::{AccessConfig, CacheBackend};
pub use directory::InMemoryDirectory;
