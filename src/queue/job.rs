//! Job record, retry policy and the status view exposed to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::state_machine::{transition, JobEvent, JobState, StateMachineResult};
use crate::types::{AnalysisRequest, AnalysisResult};

/// Largest exponent applied to the base delay; keeps the multiplication finite
const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Cap for delays too large to represent as a timestamp offset
const MAX_DELAY_DAYS: i64 = 365;

/// Retry delay policy stored with each job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// `base_delay * 2^(attempt - 1)`
    Exponential { base_delay_ms: u64 },
}

impl BackoffPolicy {
    pub fn exponential(base_delay: Duration) -> Self {
        Self::Exponential {
            base_delay_ms: u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Delay before re-entering the queue after failed attempt number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential { base_delay_ms } => {
                let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
                Duration::from_millis(base_delay_ms.saturating_mul(1u64 << exponent))
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Exponential {
            base_delay_ms: 2000,
        }
    }
}

/// One unit of asynchronous analysis work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub payload: AnalysisRequest,
    pub state: JobState,
    /// Number of times the job has entered `active`
    pub attempts: u32,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    pub result: Option<AnalysisResult>,
    /// Most recent failure, kept across retries
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time a worker may claim the job
    pub available_at: DateTime<Utc>,
    /// When the current or last attempt began
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(payload: AnalysisRequest, max_attempts: u32, backoff: BackoffPolicy) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payload,
            state: JobState::Queued,
            attempts: 0,
            max_attempts,
            backoff,
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            available_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    fn apply(&mut self, event: &JobEvent, now: DateTime<Utc>) -> StateMachineResult<()> {
        self.state = transition(self.state, event)?;
        self.updated_at = now;
        if self.state.is_terminal() {
            self.finished_at = Some(now);
        }
        Ok(())
    }

    /// Enter `active`; this counts as an attempt
    pub fn claim(&mut self, now: DateTime<Utc>) -> StateMachineResult<()> {
        self.apply(&JobEvent::Claim, now)?;
        self.attempts += 1;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, result: AnalysisResult) -> StateMachineResult<()> {
        let now = Utc::now();
        self.apply(&JobEvent::Complete, now)?;
        self.result = Some(result);
        Ok(())
    }

    /// Return to the queue, claimable again after the backoff delay
    pub fn schedule_retry(&mut self, reason: impl Into<String>) -> StateMachineResult<Duration> {
        let reason = reason.into();
        let now = Utc::now();
        let delay = self.backoff.delay_for_attempt(self.attempts);
        self.apply(&JobEvent::retry_after_error(reason.clone()), now)?;
        self.failure_reason = Some(reason);
        let offset = chrono::Duration::from_std(delay)
            .unwrap_or_else(|_| chrono::Duration::days(MAX_DELAY_DAYS));
        self.available_at = now.checked_add_signed(offset).unwrap_or(now);
        Ok(delay)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> StateMachineResult<()> {
        let reason = reason.into();
        let now = Utc::now();
        self.apply(&JobEvent::fail_with_error(reason.clone()), now)?;
        self.failure_reason = Some(reason);
        Ok(())
    }

    /// Hand an abandoned job back to the queue without delay
    pub fn requeue_stalled(&mut self) -> StateMachineResult<()> {
        let now = Utc::now();
        self.apply(&JobEvent::Stall, now)?;
        self.available_at = now;
        Ok(())
    }

    pub fn has_attempts_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn status(&self) -> JobStatus {
        match self.state {
            JobState::Queued => JobStatus::Queued,
            JobState::Active => JobStatus::Active,
            JobState::Completed => match &self.result {
                Some(result) => JobStatus::Completed {
                    result: result.clone(),
                },
                None => JobStatus::Failed {
                    error: "completed without a recorded result".to_string(),
                },
            },
            JobState::Failed => JobStatus::Failed {
                error: self
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "unknown failure".to_string()),
            },
        }
    }
}

/// Caller-facing job status; serializes as `{"status": "...", ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    NotFound,
    Queued,
    Active,
    Completed { result: AnalysisResult },
    Failed { error: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Per-state job counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl JobCounts {
    pub fn add(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Queued => self.queued += count,
            JobState::Active => self.active += count,
            JobState::Completed => self.completed += count,
            JobState::Failed => self.failed += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.queued + self.active + self.completed + self.failed
    }
}
