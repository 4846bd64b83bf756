//! Job lifecycle event stream
//!
//! Observability only: job correctness never depends on anyone listening.

pub mod publisher;

pub use publisher::{spawn_event_logger, EventPublisher, JobLifecycleEvent, JobLifecycleKind};
