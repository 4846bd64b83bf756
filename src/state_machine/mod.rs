//! # Job State Machine
//!
//! Transitions are synchronous and side-effect free; the job queue applies
//! them and persists the resulting state.

pub mod errors;
pub mod events;
pub mod states;
pub mod transitions;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::JobEvent;
pub use states::JobState;
pub use transitions::transition;
