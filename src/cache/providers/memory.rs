//! In-process cache provider
//!
//! Per-entry expiry on top of a `DashMap`. State is NOT shared between
//! processes; use it for single-instance deployments and tests.
//!
//! Expired entries are evicted when read, and in bulk every
//! [`SWEEP_EVERY_WRITES`] writes so keys written once never pile up.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;

/// Writes between bulk sweeps of expired entries
pub const SWEEP_EVERY_WRITES: u64 = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory cache service with per-entry TTL
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheService {
    entries: Arc<DashMap<String, Entry>>,
    writes: Arc<AtomicU64>,
}

impl InMemoryCacheService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including any not yet evicted after expiry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed = removed, "Expired entries purged (memory)");
        }
        removed
    }
}

#[async_trait]
impl CacheService for InMemoryCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                debug!(key = key, "Cache MISS (memory)");
                return Ok(None);
            }
        };

        if hit.is_none() {
            // Expired: evict lazily, but only if nobody re-set it in between
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
            debug!(key = key, "Cache EXPIRED (memory)");
        } else {
            debug!(key = key, "Cache HIT (memory)");
        }

        Ok(hit)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        debug!(key = key, ttl_ms = ttl.as_millis() as u64, "Cache SET (memory)");

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY_WRITES == 0 {
            self.purge_expired();
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        debug!(key = key, "Cache DEL (memory)");
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
