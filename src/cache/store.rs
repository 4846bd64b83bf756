//! Fail-open analysis result cache
//!
//! [`AnalysisCache`] is the only component that touches cache entries. It maps
//! texts to [`CacheKey`]s, serializes [`AnalysisResult`]s as JSON, and turns
//! every backend problem into a miss (`get`) or a `false` (`set` / `delete`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::errors::{CacheError, CacheResult};
use super::providers::{NoOpCacheService, RedisCacheService};
use super::traits::CacheService;
use crate::config::CacheConfig;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use crate::types::{AnalysisResult, CacheKey};

/// Snapshot of the cache's operating mode
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStatus {
    pub provider: &'static str,
    /// Whether entries are shared with other processes
    pub distributed: bool,
    /// True when the backend never connected or the breaker is not closed
    pub degraded: bool,
    pub circuit_state: Option<CircuitState>,
}

/// Content-addressable, fail-open result cache
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    backend: Arc<dyn CacheService>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    /// Set when the startup connection attempt failed
    connect_failed: Arc<AtomicBool>,
    /// Set by [`AnalysisCache::shutdown`]; no backend call is made afterwards
    shut_down: Arc<AtomicBool>,
    default_ttl: Duration,
    operation_timeout: Duration,
}

impl AnalysisCache {
    /// Connect to the configured backend once, falling back to no-op on failure.
    ///
    /// Never fails: an unreachable backend leaves the cache in degraded mode.
    pub async fn connect(config: &CacheConfig) -> Self {
        let breaker_config: CircuitBreakerConfig = (&config.circuit_breaker).into();

        if !config.enabled {
            info!("Analysis cache disabled by configuration");
            return Self::with_backend(
                Arc::new(NoOpCacheService::new()),
                config.ttl(),
                config.operation_timeout(),
                None,
            );
        }

        let connect_timeout = config.operation_timeout().max(Duration::from_secs(1));
        match RedisCacheService::connect(&config.redis_url, connect_timeout).await {
            Ok(service) => {
                info!(backend = "redis", "Analysis cache connected");
                Self::with_backend(
                    Arc::new(service),
                    config.ttl(),
                    config.operation_timeout(),
                    Some(breaker_config),
                )
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to cache backend, running without cache (degraded)"
                );
                let cache = Self::with_backend(
                    Arc::new(NoOpCacheService::new()),
                    config.ttl(),
                    config.operation_timeout(),
                    None,
                );
                cache.connect_failed.store(true, Ordering::Release);
                cache
            }
        }
    }

    /// Build a cache over an already-constructed backend.
    ///
    /// A circuit breaker is attached only when `breaker` is given.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use analysis_orchestrator::cache::{AnalysisCache, InMemoryCacheService};
    /// use analysis_orchestrator::AnalysisResult;
    ///
    /// # tokio_test::block_on(async {
    /// let cache = AnalysisCache::with_backend(
    ///     Arc::new(InMemoryCacheService::new()),
    ///     Duration::from_secs(60),
    ///     Duration::from_millis(100),
    ///     None,
    /// );
    /// let result = AnalysisResult::new(serde_json::json!({"tokens": []}));
    /// assert!(cache.set("The cat", &result).await);
    /// assert_eq!(cache.get("The cat").await, Some(result));
    /// # });
    /// ```
    pub fn with_backend(
        backend: Arc<dyn CacheService>,
        default_ttl: Duration,
        operation_timeout: Duration,
        breaker: Option<CircuitBreakerConfig>,
    ) -> Self {
        let circuit_breaker =
            breaker.map(|cfg| Arc::new(CircuitBreaker::new("cache".to_string(), cfg)));

        Self {
            backend,
            circuit_breaker,
            connect_failed: Arc::new(AtomicBool::new(false)),
            shut_down: Arc::new(AtomicBool::new(false)),
            default_ttl,
            operation_timeout,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::with_backend(
            Arc::new(NoOpCacheService::new()),
            Duration::from_secs(3600),
            Duration::from_millis(500),
            None,
        )
    }

    /// Deterministic key for `text`; pure
    pub fn compute_key(text: &str) -> CacheKey {
        CacheKey::for_text(text)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a cached result. Any failure is reported as a miss.
    pub async fn get(&self, text: &str) -> Option<AnalysisResult> {
        let key = Self::compute_key(text);

        let raw = match self.guarded("get", |backend| {
            let key = key.clone();
            async move { backend.get(key.as_str()).await }
        })
        .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(cache_key = %key, error = %e, "Cache get failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<AnalysisResult>(&raw) {
            Ok(result) => {
                info!(cache_key = %key, "Cache hit");
                Some(result)
            }
            Err(e) => {
                warn!(
                    cache_key = %key,
                    error = %CacheError::SerializationError(e.to_string()),
                    "Discarding undecodable cache entry"
                );
                None
            }
        }
    }

    /// Store `result` under the default TTL; returns whether the write landed
    pub async fn set(&self, text: &str, result: &AnalysisResult) -> bool {
        self.set_with_ttl(text, result, self.default_ttl).await
    }

    pub async fn set_with_ttl(&self, text: &str, result: &AnalysisResult, ttl: Duration) -> bool {
        let key = Self::compute_key(text);

        let value = match serde_json::to_string(result) {
            Ok(value) => value,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to serialize analysis result for cache");
                return false;
            }
        };

        match self
            .guarded("set", |backend| {
                let key = key.clone();
                async move { backend.set(key.as_str(), &value, ttl).await }
            })
            .await
        {
            Ok(()) => {
                info!(cache_key = %key, ttl_seconds = ttl.as_secs(), "Cache set");
                true
            }
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Explicitly invalidate the entry for `text`
    pub async fn delete(&self, text: &str) -> bool {
        let key = Self::compute_key(text);

        match self
            .guarded("delete", |backend| {
                let key = key.clone();
                async move { backend.delete(key.as_str()).await }
            })
            .await
        {
            Ok(()) => {
                info!(cache_key = %key, "Cache delete");
                true
            }
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Check the backend directly, bypassing the breaker
    pub async fn health_check(&self) -> bool {
        if self.connect_failed.load(Ordering::Acquire) || self.is_shut_down() {
            return false;
        }
        matches!(
            tokio::time::timeout(self.operation_timeout, self.backend.health_check()).await,
            Ok(Ok(true))
        )
    }

    pub fn is_degraded(&self) -> bool {
        self.connect_failed.load(Ordering::Acquire)
            || self.is_shut_down()
            || self
                .circuit_breaker
                .as_ref()
                .is_some_and(|cb| cb.state() != CircuitState::Closed)
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            provider: self.backend.provider_name(),
            distributed: self.backend.is_distributed(),
            degraded: self.is_degraded(),
            circuit_state: self.circuit_breaker.as_ref().map(|cb| cb.state()),
        }
    }

    /// Stop using the backend; every later operation is a miss or `false`
    ///
    /// Clones share the flag, so shutting down one handle stops them all.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        info!(provider = self.backend.provider_name(), "Analysis cache shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Run one backend operation under the operation timeout and, when present, the breaker
    async fn guarded<T, F, Fut>(&self, operation: &'static str, op: F) -> CacheResult<T>
    where
        F: FnOnce(Arc<dyn CacheService>) -> Fut,
        Fut: std::future::Future<Output = CacheResult<T>>,
    {
        if self.is_shut_down() {
            return Err(CacheError::Unavailable(format!("{operation} after shutdown")));
        }

        let backend = Arc::clone(&self.backend);
        let timeout = self.operation_timeout;
        let bounded = move || async move {
            match tokio::time::timeout(timeout, op(backend)).await {
                Ok(result) => result,
                Err(_) => Err(CacheError::Timeout(format!(
                    "{operation} exceeded {}ms",
                    timeout.as_millis()
                ))),
            }
        };

        match &self.circuit_breaker {
            None => bounded().await,
            Some(cb) => cb.call(bounded).await.map_err(|e| match e {
                CircuitBreakerError::CircuitOpen { component } => {
                    CacheError::Unavailable(format!("circuit open for {component}"))
                }
                CircuitBreakerError::OperationFailed(inner) => inner,
            }),
        }
    }
}
