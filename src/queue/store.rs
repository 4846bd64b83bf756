use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::QueueResult;
use super::job::{Job, JobCounts};

/// Backing store for analysis jobs
///
/// Every method must be safe to call concurrently from many workers. Claiming
/// is the only operation that needs atomicity: two workers must never both
/// receive the same queued job.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    async fn insert(&self, job: &Job) -> QueueResult<()>;

    /// Atomically move the oldest claimable job (`queued`, `available_at <= now`)
    /// to `active`, incrementing its attempt count
    async fn claim_next(&self, now: DateTime<Utc>) -> QueueResult<Option<Job>>;

    /// Persist the outcome of attempt `job.attempts`.
    ///
    /// Applied only while the stored job is still `active` on that same
    /// attempt; returns `false` when the write was stale (the job was
    /// recovered as stalled and possibly claimed again meanwhile).
    async fn record_attempt(&self, job: &Job) -> QueueResult<bool>;

    async fn find(&self, id: Uuid) -> QueueResult<Option<Job>>;

    /// Active jobs whose current attempt started before `cutoff`
    async fn find_stalled(&self, cutoff: DateTime<Utc>, limit: usize) -> QueueResult<Vec<Job>>;

    async fn counts(&self) -> QueueResult<JobCounts>;

    async fn health_check(&self) -> QueueResult<bool>;

    fn backend_name(&self) -> &'static str;

    /// Whether queued jobs survive a process restart
    fn is_durable(&self) -> bool;
}
