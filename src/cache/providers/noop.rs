//! No-op cache provider
//!
//! Always returns None/success. Used when caching is disabled or when the
//! backend could not be reached at startup.

use async_trait::async_trait;
use std::time::Duration;

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;

/// No-op cache service that never caches anything
#[derive(Debug, Clone, Default)]
pub struct NoOpCacheService;

impl NoOpCacheService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheService for NoOpCacheService {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_get_after_set_misses() {
        let svc = NoOpCacheService::new();
        svc.set("key", "value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(svc.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_noop_delete_succeeds() {
        let svc = NoOpCacheService::new();
        svc.delete("key").await.unwrap();
    }

    #[test]
    fn test_noop_provider_name() {
        let svc = NoOpCacheService::new();
        assert_eq!(svc.provider_name(), "noop");
        assert!(!svc.is_distributed());
    }
}
