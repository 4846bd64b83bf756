#![allow(dead_code)]

pub mod stubs;
pub mod strategies;

pub use stubs::*;

use std::sync::Arc;
use std::time::Duration;

use analysis_orchestrator::cache::{CacheService, InMemoryCacheService};
use analysis_orchestrator::queue::{InMemoryJobStore, JobStatus};
use analysis_orchestrator::{AnalysisCache, AnalysisSystem, JobQueue, OrchestratorConfig};
use uuid::Uuid;

/// Configuration with timings shrunk for tests
pub fn test_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.engine.timeout_ms = 50;
    config.cache.operation_timeout_ms = 100;
    config.queue.backoff_base_delay_ms = 5;
    config.queue.poll_interval_ms = 5;
    config.queue.worker_count = 2;
    config.queue.event_channel_capacity = 256;
    config
}

pub fn cache_over(backend: Arc<dyn CacheService>) -> AnalysisCache {
    AnalysisCache::with_backend(
        backend,
        Duration::from_secs(3600),
        Duration::from_millis(100),
        None,
    )
}

/// In-process system: memory cache, memory job store, stub engine
pub fn memory_system(engine: Arc<StubEngine>) -> AnalysisSystem {
    memory_system_with(engine, Arc::new(InMemoryCacheService::new()), test_config())
}

pub fn memory_system_with(
    engine: Arc<StubEngine>,
    cache_backend: Arc<dyn CacheService>,
    config: OrchestratorConfig,
) -> AnalysisSystem {
    AnalysisSystem::from_parts(
        config,
        cache_over(cache_backend),
        engine,
        Arc::new(InMemoryJobStore::new()),
    )
}

/// Poll job status until it is terminal or `timeout` passes
pub async fn wait_for_terminal(queue: &JobQueue, job_id: Uuid, timeout: Duration) -> JobStatus {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let status = queue.status(job_id).await.expect("status query failed");
        if status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A text of exactly `chars` characters
pub fn text_of_length(chars: usize) -> String {
    "The cat sat on the mat. "
        .chars()
        .cycle()
        .take(chars)
        .collect()
}
