//! Cache service trait definition

use async_trait::async_trait;
use std::time::Duration;

use super::errors::CacheResult;

/// Key/value backing store for cached analysis results
///
/// Values are opaque strings (serialized JSON). Implementations must be safe
/// for concurrent per-key get/set; no cross-key atomicity is required.
#[async_trait]
pub trait CacheService: Send + Sync + std::fmt::Debug {
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` on miss
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    async fn health_check(&self) -> CacheResult<bool>;

    fn provider_name(&self) -> &'static str;

    /// Whether the backend lives outside this process (network calls involved)
    fn is_distributed(&self) -> bool {
        false
    }
}
