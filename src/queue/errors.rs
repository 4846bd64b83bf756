use thiserror::Error;
use uuid::Uuid;

use crate::state_machine::StateMachineError;

/// Job queue failures
///
/// Unlike cache errors these are never absorbed: the queue has no fail-open
/// mode, so enqueue and status calls surface them to the caller.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing store could not be reached or rejected the operation
    #[error("Queue backend error: {0}")]
    Backend(String),

    /// A stored job could not be encoded or decoded
    #[error("Job serialization error: {0}")]
    Serialization(String),

    #[error("Invalid job transition: {0}")]
    InvalidTransition(#[from] StateMachineError),

    #[error("Job not found: {0}")]
    NotFound(Uuid),
}

impl QueueError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

impl From<sqlx::Error> for QueueError {
    fn from(error: sqlx::Error) -> Self {
        Self::Backend(error.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for QueueError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Backend(format!("migration failed: {error}"))
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
