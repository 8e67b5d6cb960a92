//! In-process cache backed by a concurrent map.

use super::{Cache, CacheConfig, CacheKey};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// A cache that lives for the lifetime of the process.
///
/// Expired entries are removed lazily when read.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    config: CacheConfig,
}

impl InMemoryCache {
    /// Creates a cache with default TTLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with the given TTL table.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Number of stored entries, including expired ones not yet read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let now = Instant::now();
        let hit = self.entries.get(key.as_str()).map(|entry| {
            if entry.expires_at > now {
                Some(entry.value.clone())
            } else {
                None
            }
        })?;

        if hit.is_none() {
            trace!(key = %key, "Cache entry expired");
            self.entries
                .remove_if(key.as_str(), |_, entry| entry.expires_at <= now);
        }
        hit
    }

    async fn set(&self, key: CacheKey, value: serde_json::Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(
            key.as_str().to_string(),
            Entry { value, expires_at },
        );
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }
}
