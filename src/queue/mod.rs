//! # Analysis Job Queue
//!
//! Durable queue of analysis jobs with at-least-once execution, exponential
//! retry backoff and per-job status.
//!
//! - [`JobStore`]: storage seam; [`PgJobStore`] is durable,
//!   [`InMemoryJobStore`] is best-effort
//! - [`JobQueue`]: enqueue, status and the execution of one claimed job
//! - [`WorkerPool`]: concurrent polling workers and stalled-job recovery

pub mod errors;
pub mod job;
pub mod job_queue;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod worker_pool;

pub use errors::{QueueError, QueueResult};
pub use job::{BackoffPolicy, Job, JobCounts, JobStatus};
pub use job_queue::{JobOutcome, JobQueue, JobQueueSettings, ProcessedJob, STALLED_FAILURE_REASON};
pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;
pub use store::JobStore;
pub use worker_pool::{WorkerPool, WorkerPoolConfig};
