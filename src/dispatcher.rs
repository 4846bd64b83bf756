//! # Dispatcher
//!
//! Single entry point for analysis requests. Short texts are analyzed inline
//! (cache-aside around one engine call); texts longer than the sync threshold
//! become queued jobs and the caller gets a handle to poll.
//!
//! The inline path never retries; retrying is a job queue property.
//! Concurrent identical inline requests are not coalesced, so both may reach
//! the engine when neither has cached a result yet.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cache::AnalysisCache;
use crate::config::OrchestratorConfig;
use crate::engine::{AnalysisEngine, EngineError};
use crate::error::Result;
use crate::queue::{JobQueue, JobStatus};
use crate::state_machine::JobState;
use crate::types::{AnalysisRequest, AnalysisResult};

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Texts with more characters than this are queued
    pub sync_threshold: usize,
    /// Ceiling for an inline engine call
    pub engine_timeout: Duration,
}

impl DispatcherSettings {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            sync_threshold: config.dispatch.sync_threshold,
            engine_timeout: config.engine.timeout(),
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

/// Handle returned for queued work: `{"job_id": "...", "status": "queued"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: Uuid,
    pub status: JobState,
}

/// Outcome of [`Dispatcher::submit`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Submission {
    /// Analysis finished inline; serializes as the bare result payload
    Completed(AnalysisResult),
    Queued(JobHandle),
}

impl Submission {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Queued(_) => None,
        }
    }

    pub fn job_handle(&self) -> Option<&JobHandle> {
        match self {
            Self::Completed(_) => None,
            Self::Queued(handle) => Some(handle),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    cache: AnalysisCache,
    engine: Arc<dyn AnalysisEngine>,
    queue: JobQueue,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        cache: AnalysisCache,
        engine: Arc<dyn AnalysisEngine>,
        queue: JobQueue,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            cache,
            engine,
            queue,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Whether `request` takes the queued path
    pub fn is_async(&self, request: &AnalysisRequest) -> bool {
        request.char_len() > self.settings.sync_threshold
    }

    /// Analyze inline or enqueue, depending on text length
    ///
    /// Inline engine failures propagate typed; on the queued path only an
    /// enqueue failure is returned, everything later shows up in job status.
    #[instrument(skip(self, request), fields(text_length = request.char_len()))]
    pub async fn submit(&self, request: AnalysisRequest) -> Result<Submission> {
        if self.is_async(&request) {
            let job = self.queue.enqueue(request).await?;
            info!(job_id = %job.id, "Request queued for background analysis");
            return Ok(Submission::Queued(JobHandle {
                job_id: job.id,
                status: job.state,
            }));
        }

        let result = self.analyze_inline(&request).await?;
        Ok(Submission::Completed(result))
    }

    /// Cache-aside analysis on the caller's task; cache trouble falls through to the engine
    pub async fn analyze_inline(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<AnalysisResult, EngineError> {
        if let Some(cached) = self.cache.get(request.text()).await {
            debug!("Serving cached analysis");
            return Ok(cached);
        }

        let result = self
            .engine
            .analyze(request, self.settings.engine_timeout)
            .await?;

        if !self.cache.set(request.text(), &result).await {
            debug!("Inline result not cached");
        }
        Ok(result)
    }

    pub async fn status(&self, job_id: Uuid) -> Result<JobStatus> {
        Ok(self.queue.status(job_id).await?)
    }
}
