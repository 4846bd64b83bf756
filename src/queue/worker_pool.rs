//! # Worker Pool
//!
//! Independent polling workers over a shared [`JobQueue`], plus one
//! housekeeping task that recovers stalled jobs.
//!
//! Each worker loops: claim and run a job; when none is ready, sleep for the
//! poll interval. Shutdown flips a shared flag and wakes sleeping workers;
//! a job already running finishes its current attempt first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::job_queue::JobQueue;
use crate::logging::log_error;

/// Pause after a store error before polling again
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Stalled jobs handled per sweep
const STALLED_SWEEP_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub worker_count: usize,
    pub poll_interval: Duration,
    /// How often the stalled-job sweep runs
    pub stalled_check_interval: Duration,
}

impl WorkerPoolConfig {
    pub fn from_queue_config(config: &crate::config::QueueConfig) -> Self {
        Self {
            worker_count: config.worker_count,
            poll_interval: config.poll_interval(),
            // Sweep a few times per stall window, at most every 30s
            stalled_check_interval: (config.stalled_timeout() / 4)
                .clamp(Duration::from_millis(100), Duration::from_secs(30)),
        }
    }
}

#[derive(Debug)]
struct PoolState {
    running: AtomicBool,
    shutdown_notify: Notify,
}

impl PoolState {
    fn should_continue(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown is signalled first; returns false on shutdown
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.should_continue(),
            _ = self.shutdown_notify.notified() => false,
        }
    }
}

/// Running set of queue workers
#[derive(Debug)]
pub struct WorkerPool {
    state: Arc<PoolState>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers and the stalled-job sweeper
    pub fn start(queue: JobQueue, config: WorkerPoolConfig) -> Self {
        let state = Arc::new(PoolState {
            running: AtomicBool::new(true),
            shutdown_notify: Notify::new(),
        });

        let worker_count = config.worker_count.max(1);
        let mut handles = Vec::with_capacity(worker_count + 1);

        for worker_id in 0..worker_count {
            let queue = queue.clone();
            let state = Arc::clone(&state);
            let poll_interval = config.poll_interval;
            handles.push(tokio::spawn(async move {
                run_worker(worker_id, queue, state, poll_interval).await;
            }));
        }

        {
            let state = Arc::clone(&state);
            let interval = config.stalled_check_interval;
            handles.push(tokio::spawn(async move {
                run_stalled_sweeper(queue, state, interval).await;
            }));
        }

        info!(
            worker_count = worker_count,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "🚀 Worker pool started"
        );

        Self { state, handles }
    }

    pub fn is_running(&self) -> bool {
        self.state.should_continue()
    }

    /// Signal every task to stop and wait up to `timeout` for them to finish
    ///
    /// Tasks still running after the timeout are aborted; an attempt cut short
    /// that way is picked up again by stalled-job recovery.
    pub async fn shutdown(self, timeout: Duration) {
        info!("Stopping worker pool");
        self.state.running.store(false, Ordering::Release);
        self.state.shutdown_notify.notify_waiters();

        let mut handles = self.handles;
        let joined = tokio::time::timeout(timeout, async {
            for handle in handles.iter_mut() {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Worker task ended abnormally");
                }
            }
        })
        .await;

        if joined.is_err() {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Worker pool did not stop within timeout, aborting remaining tasks"
            );
            for handle in &handles {
                handle.abort();
            }
        }

        info!("🛑 Worker pool stopped");
    }
}

async fn run_worker(worker_id: usize, queue: JobQueue, state: Arc<PoolState>, poll_interval: Duration) {
    debug!(worker_id = worker_id, "Worker started");

    while state.should_continue() {
        match queue.process_next().await {
            Ok(Some(processed)) => {
                debug!(
                    worker_id = worker_id,
                    job_id = %processed.job_id,
                    attempt = processed.attempt,
                    outcome = ?processed.outcome,
                    "Job attempt finished"
                );
                // More work may be waiting; poll again immediately
            }
            Ok(None) => {
                if !state.pause(poll_interval).await {
                    break;
                }
            }
            Err(e) => {
                log_error(
                    "worker_pool",
                    "process_next",
                    &e.to_string(),
                    Some(&format!("worker_id={worker_id}")),
                );
                if !state.pause(ERROR_BACKOFF).await {
                    break;
                }
            }
        }
    }

    debug!(worker_id = worker_id, "Worker stopped");
}

async fn run_stalled_sweeper(queue: JobQueue, state: Arc<PoolState>, interval: Duration) {
    while state.pause(interval).await {
        match queue.recover_stalled(STALLED_SWEEP_LIMIT).await {
            Ok(0) => {}
            Ok(recovered) => info!(recovered = recovered, "Stalled jobs recovered"),
            Err(e) => log_error("worker_pool", "recover_stalled", &e.to_string(), None),
        }
    }
}
