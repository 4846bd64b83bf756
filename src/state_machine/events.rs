use serde::{Deserialize, Serialize};

/// Events that drive job state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobEvent {
    /// A worker picked the job up
    Claim,
    /// The attempt produced a result
    Complete,
    /// The attempt failed transiently and another attempt is allowed
    Retry(String),
    /// The job cannot succeed
    Fail(String),
    /// The owning worker went away; hand the job back to the queue
    Stall,
}

impl JobEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Complete => "complete",
            Self::Retry(_) => "retry",
            Self::Fail(_) => "fail",
            Self::Stall => "stall",
        }
    }

    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }

    pub fn retry_after_error(error: impl Into<String>) -> Self {
        Self::Retry(error.into())
    }
}
