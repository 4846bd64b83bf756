//! # Job Queue
//!
//! Enqueue, status and single-job execution for asynchronous analysis.
//!
//! One execution of a claimed job:
//!
//! 1. cached result for the text → `completed` (no engine call, no re-cache)
//! 2. engine success → cache write, then `completed`
//! 3. `Unavailable` / `Transport` with attempts left → back to `queued` after
//!    `base_delay * 2^(attempts-1)`
//! 4. anything else → `failed` with the last failure reason

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::errors::QueueResult;
use super::job::{BackoffPolicy, Job, JobCounts, JobStatus};
use super::store::JobStore;
use crate::cache::AnalysisCache;
use crate::config::{EngineConfig, QueueConfig};
use crate::engine::AnalysisEngine;
use crate::events::{EventPublisher, JobLifecycleKind};
use crate::logging::log_job_operation;
use crate::types::AnalysisRequest;

/// Failure reason recorded for jobs abandoned too many times
pub const STALLED_FAILURE_REASON: &str = "job stalled more than allowable limit";

/// Per-job retry and timing parameters
#[derive(Debug, Clone)]
pub struct JobQueueSettings {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Ceiling for each engine call made by a worker
    pub engine_timeout: Duration,
    /// Active jobs older than this are treated as abandoned
    pub stalled_timeout: Duration,
}

impl JobQueueSettings {
    pub fn from_config(queue: &QueueConfig, engine: &EngineConfig) -> Self {
        Self {
            max_attempts: queue.max_attempts,
            backoff: BackoffPolicy::exponential(queue.backoff_base_delay()),
            engine_timeout: engine.timeout(),
            stalled_timeout: queue.stalled_timeout(),
        }
    }
}

impl Default for JobQueueSettings {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default(), &EngineConfig::default())
    }
}

/// What a worker did with one claimed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { from_cache: bool },
    RetryScheduled { attempt: u32, delay: Duration },
    Failed { reason: String },
    /// The job was recovered as stalled while this attempt ran; its result was dropped
    Superseded,
}

/// Result of one `process_next` call that found work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedJob {
    pub job_id: Uuid,
    pub attempt: u32,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    cache: AnalysisCache,
    engine: Arc<dyn AnalysisEngine>,
    events: EventPublisher,
    settings: JobQueueSettings,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        cache: AnalysisCache,
        engine: Arc<dyn AnalysisEngine>,
        events: EventPublisher,
        settings: JobQueueSettings,
    ) -> Self {
        if !store.is_durable() {
            warn!(
                backend = store.backend_name(),
                "Job store is not durable; queued jobs are lost on restart"
            );
        }

        Self {
            store,
            cache,
            engine,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &JobQueueSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Persist a new `queued` job with no attempts
    #[instrument(skip(self, request), fields(text_length = request.char_len()))]
    pub async fn enqueue(&self, request: AnalysisRequest) -> QueueResult<Job> {
        let job = Job::new(request, self.settings.max_attempts, self.settings.backoff);
        self.store.insert(&job).await?;

        let job_id = job.id.to_string();
        log_job_operation("enqueue", Some(&job_id), None, job.state.as_str(), None);
        self.events.publish(job.id, JobLifecycleKind::Enqueued);
        Ok(job)
    }

    /// Current recorded status; never waits for the job to progress
    pub async fn status(&self, job_id: Uuid) -> QueueResult<JobStatus> {
        Ok(self
            .store
            .find(job_id)
            .await?
            .map(|job| job.status())
            .unwrap_or(JobStatus::NotFound))
    }

    pub async fn get_job(&self, job_id: Uuid) -> QueueResult<Option<Job>> {
        self.store.find(job_id).await
    }

    pub async fn counts(&self) -> QueueResult<JobCounts> {
        self.store.counts().await
    }

    /// Claim one ready job and run it to its next recorded state
    pub async fn process_next(&self) -> QueueResult<Option<ProcessedJob>> {
        let Some(job) = self.store.claim_next(Utc::now()).await? else {
            return Ok(None);
        };

        let job_id = job.id;
        let attempt = job.attempts;
        self.events
            .publish(job_id, JobLifecycleKind::Started { attempt });
        log_job_operation(
            "claim",
            Some(&job_id.to_string()),
            Some(attempt),
            job.state.as_str(),
            None,
        );

        let outcome = self.execute(job).await?;
        Ok(Some(ProcessedJob {
            job_id,
            attempt,
            outcome,
        }))
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, attempt = job.attempts))]
    async fn execute(&self, mut job: Job) -> QueueResult<JobOutcome> {
        let text = job.payload.text().to_string();

        if let Some(cached) = self.cache.get(&text).await {
            debug!("Cached result found, skipping engine call");
            job.complete(cached)?;
            return self
                .commit(&job, JobOutcome::Completed { from_cache: true })
                .await;
        }

        match self
            .engine
            .analyze(&job.payload, self.settings.engine_timeout)
            .await
        {
            Ok(result) => {
                if !self.cache.set(&text, &result).await {
                    debug!("Result not cached; job still completes");
                }
                job.complete(result)?;
                self.commit(&job, JobOutcome::Completed { from_cache: false })
                    .await
            }
            Err(error) if error.is_retryable() && job.has_attempts_remaining() => {
                let delay = job.schedule_retry(error.to_string())?;
                info!(
                    kind = error.kind(),
                    delay_ms = delay.as_millis() as u64,
                    "Engine call failed, retry scheduled"
                );
                self.commit(
                    &job,
                    JobOutcome::RetryScheduled {
                        attempt: job.attempts,
                        delay,
                    },
                )
                .await
            }
            Err(error) => {
                let reason = error.to_string();
                warn!(kind = error.kind(), error = %reason, "Job failed");
                job.fail(reason.clone())?;
                self.commit(&job, JobOutcome::Failed { reason }).await
            }
        }
    }

    /// Record the attempt outcome and announce it
    async fn commit(&self, job: &Job, outcome: JobOutcome) -> QueueResult<JobOutcome> {
        if !self.store.record_attempt(job).await? {
            warn!(
                job_id = %job.id,
                attempt = job.attempts,
                "Attempt outcome discarded; job was recovered while running"
            );
            return Ok(JobOutcome::Superseded);
        }

        let job_id = job.id.to_string();
        log_job_operation(
            "attempt_finished",
            Some(&job_id),
            Some(job.attempts),
            job.state.as_str(),
            job.failure_reason.as_deref(),
        );

        let kind = match &outcome {
            JobOutcome::Completed { from_cache } => JobLifecycleKind::Completed {
                from_cache: *from_cache,
            },
            JobOutcome::RetryScheduled { attempt, delay } => JobLifecycleKind::RetryScheduled {
                attempt: *attempt,
                delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                reason: job.failure_reason.clone().unwrap_or_default(),
            },
            JobOutcome::Failed { reason } => JobLifecycleKind::Failed {
                attempts: job.attempts,
                reason: reason.clone(),
            },
            JobOutcome::Superseded => return Ok(outcome),
        };
        self.events.publish(job.id, kind);

        Ok(outcome)
    }

    /// Requeue jobs whose worker went away; fail those out of attempts
    ///
    /// Returns how many jobs were recovered or failed.
    pub async fn recover_stalled(&self, limit: usize) -> QueueResult<usize> {
        let stalled_for = chrono::Duration::from_std(self.settings.stalled_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let cutoff = Utc::now() - stalled_for;

        let mut handled = 0;
        for mut job in self.store.find_stalled(cutoff, limit).await? {
            let attempt = job.attempts;
            let exhausted = !job.has_attempts_remaining();
            if exhausted {
                job.fail(STALLED_FAILURE_REASON)?;
            } else {
                job.requeue_stalled()?;
            }

            if !self.store.record_attempt(&job).await? {
                continue;
            }
            handled += 1;

            warn!(job_id = %job.id, attempt = attempt, exhausted = exhausted, "Recovered stalled job");
            self.events
                .publish(job.id, JobLifecycleKind::Stalled { attempt });
            if exhausted {
                self.events.publish(
                    job.id,
                    JobLifecycleKind::Failed {
                        attempts: attempt,
                        reason: STALLED_FAILURE_REASON.to_string(),
                    },
                );
            }
        }

        Ok(handled)
    }
}
