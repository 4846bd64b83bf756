//! Engine client error taxonomy

use thiserror::Error;

/// Why an analysis call did not produce a result
///
/// Only [`EngineError::Unavailable`] and [`EngineError::Transport`] are worth
/// another attempt; a rejection means the input itself is bad.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No response within the timeout, connection refused, or the engine
    /// reported itself temporarily unable to serve
    #[error("Analysis engine unavailable: {reason}")]
    Unavailable { reason: String },

    /// The engine answered with a structured error for this input
    #[error("Analysis engine rejected the request ({status_code}): {detail}")]
    Rejected { status_code: u16, detail: String },

    /// Request could not be built or the response could not be decoded
    #[error("Analysis engine transport error: {message}")]
    Transport { message: String },
}

impl EngineError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(status_code: u16, detail: impl Into<String>) -> Self {
        Self::Rejected {
            status_code,
            detail: detail.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether the job queue may schedule another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Transport { .. })
    }

    /// Short classification label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Rejected { .. } => "rejected",
            Self::Transport { .. } => "transport",
        }
    }
}
