//! Cache shared by collaborator stages across requests.
//!
//! Keys follow `<domain>:<networkId?>:<id>` and each domain carries its own
//! TTL, so price data refreshes hourly while immutable metadata is kept for
//! a year.

mod config;
mod key;
mod memory;

pub use config::CacheConfig;
pub use key::{CacheDomain, CacheKey};
pub use memory::InMemoryCache;

use async_trait::async_trait;
use std::time::Duration;

/// A cache safe for concurrent get/set.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the cached value, if present and not expired.
    async fn get(&self, key: &CacheKey) -> Option<serde_json::Value>;

    /// Stores a value with an explicit TTL.
    async fn set(&self, key: CacheKey, value: serde_json::Value, ttl: Duration);

    /// The TTL table used by [`set_for_domain`](Cache::set_for_domain).
    fn config(&self) -> &CacheConfig;

    /// Stores a value with the TTL configured for the key's domain.
    async fn set_for_domain(&self, key: CacheKey, value: serde_json::Value) {
        let ttl = self.config().ttl_for(key.domain());
        self.set(key, value, ttl).await;
    }
}
