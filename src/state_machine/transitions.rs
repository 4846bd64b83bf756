//! Pure transition function for the job lifecycle
//!
//! ```text
//! queued --claim--> active --complete--> completed
//!                    |  |
//!                    |  +--fail--> failed
//!                    +--retry/stall--> queued
//! ```

use super::errors::{StateMachineError, StateMachineResult};
use super::events::JobEvent;
use super::states::JobState;

/// Determine the target state for `event` applied in `current`
pub fn transition(current: JobState, event: &JobEvent) -> StateMachineResult<JobState> {
    let target = match (current, event) {
        (JobState::Queued, JobEvent::Claim) => JobState::Active,

        (JobState::Active, JobEvent::Complete) => JobState::Completed,
        (JobState::Active, JobEvent::Fail(_)) => JobState::Failed,

        // Back to the queue for another attempt
        (JobState::Active, JobEvent::Retry(_)) => JobState::Queued,
        (JobState::Active, JobEvent::Stall) => JobState::Queued,

        (from_state, _) => {
            return Err(StateMachineError::InvalidTransition {
                from: from_state.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}
