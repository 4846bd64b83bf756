//! Crate-level error taxonomy
//!
//! Cache failures never appear here: the cache absorbs them and reports a miss.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::engine::EngineError;
use crate::queue::QueueError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl AnalysisError {
    /// HTTP status an outer shell should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(e) => e.status_code(),
            Self::Engine(EngineError::Unavailable { .. }) => 503,
            Self::Engine(EngineError::Rejected { status_code, .. }) => *status_code,
            Self::Engine(EngineError::Transport { .. }) => 502,
            Self::Queue(QueueError::Backend(_)) => 503,
            Self::Queue(_) | Self::Configuration(_) => 500,
        }
    }

    /// Whether the caller may reasonably try the same request again later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_retryable(),
            Self::Queue(QueueError::Backend(_)) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
