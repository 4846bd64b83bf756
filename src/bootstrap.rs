//! # System Bootstrap
//!
//! Builds the cache, engine client, job queue and dispatcher once, with an
//! explicit `connect` / `shutdown` lifecycle, and hands out the shared
//! handles. Nothing here is a process-wide singleton.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::AnalysisCache;
use crate::config::OrchestratorConfig;
use crate::dispatcher::{Dispatcher, DispatcherSettings};
use crate::engine::{AnalysisEngine, HttpEngineClient};
use crate::error::Result;
use crate::events::{spawn_event_logger, EventPublisher};
use crate::health::{check_health, HealthReport};
use crate::queue::{JobQueue, JobQueueSettings, JobStore, PgJobStore, WorkerPool, WorkerPoolConfig};

/// Snapshot of the running system
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemStatus {
    pub workers_running: bool,
    pub worker_count: usize,
    pub cache_provider: &'static str,
    pub cache_degraded: bool,
    pub queue_backend: &'static str,
    pub queue_durable: bool,
    pub sync_threshold: usize,
}

/// Fully wired orchestrator
#[derive(Debug)]
pub struct AnalysisSystem {
    config: OrchestratorConfig,
    cache: AnalysisCache,
    engine: Arc<dyn AnalysisEngine>,
    queue: JobQueue,
    dispatcher: Dispatcher,
    pg_store: Option<PgJobStore>,
    workers: Option<WorkerPool>,
    event_logger: Option<JoinHandle<()>>,
}

impl AnalysisSystem {
    /// Connect every backing service described by `config`
    ///
    /// The cache never fails to connect (it degrades instead); the engine
    /// client and the job store do.
    pub async fn connect(config: OrchestratorConfig) -> Result<Self> {
        info!("🏗️ Bootstrapping analysis orchestrator");

        let cache = AnalysisCache::connect(&config.cache).await;
        let engine: Arc<dyn AnalysisEngine> = Arc::new(HttpEngineClient::new(&config.engine)?);
        let pg_store = PgJobStore::connect(&config.queue).await?;
        let store: Arc<dyn JobStore> = Arc::new(pg_store.clone());

        let mut system = Self::from_parts(config, cache, engine, store);
        system.pg_store = Some(pg_store);

        info!(status = ?system.status(), "✅ Analysis orchestrator ready");
        Ok(system)
    }

    /// Wire already-built components; used with in-memory stores and test doubles.
    ///
    /// Spawns the lifecycle event logger, so it must run inside a Tokio runtime.
    pub fn from_parts(
        config: OrchestratorConfig,
        cache: AnalysisCache,
        engine: Arc<dyn AnalysisEngine>,
        store: Arc<dyn JobStore>,
    ) -> Self {
        let events = EventPublisher::new(config.queue.event_channel_capacity);
        let event_logger = Some(spawn_event_logger(&events));

        let queue = JobQueue::new(
            store,
            cache.clone(),
            Arc::clone(&engine),
            events,
            JobQueueSettings::from_config(&config.queue, &config.engine),
        );
        let dispatcher = Dispatcher::new(
            cache.clone(),
            Arc::clone(&engine),
            queue.clone(),
            DispatcherSettings::from_config(&config),
        );

        Self {
            config,
            cache,
            engine,
            queue,
            dispatcher,
            pg_store: None,
            workers: None,
            event_logger,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Start the worker pool; a second call is a no-op
    pub fn start_workers(&mut self) {
        if self.workers.is_some() {
            warn!("Worker pool already running");
            return;
        }
        self.workers = Some(WorkerPool::start(
            self.queue.clone(),
            WorkerPoolConfig::from_queue_config(&self.config.queue),
        ));
    }

    pub async fn health(&self) -> HealthReport {
        check_health(&self.engine, &self.cache, &self.queue).await
    }

    pub fn status(&self) -> SystemStatus {
        let cache = self.cache.status();
        let store = self.queue.store();
        SystemStatus {
            workers_running: self.workers.as_ref().is_some_and(WorkerPool::is_running),
            worker_count: self.config.queue.worker_count,
            cache_provider: cache.provider,
            cache_degraded: cache.degraded,
            queue_backend: store.backend_name(),
            queue_durable: store.is_durable(),
            sync_threshold: self.config.dispatch.sync_threshold,
        }
    }

    /// Stop workers, then release the cache and the database pool
    pub async fn shutdown(mut self, timeout: Duration) {
        info!("🛑 Shutting down analysis orchestrator");

        if let Some(workers) = self.workers.take() {
            workers.shutdown(timeout).await;
        }
        self.cache.shutdown();
        if let Some(store) = self.pg_store.take() {
            store.close().await;
        }
        if let Some(logger) = self.event_logger.take() {
            logger.abort();
        }

        info!("Analysis orchestrator stopped");
    }
}
