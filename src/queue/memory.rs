//! Process-local job store
//!
//! Best-effort: every job is lost when the process exits. Suitable for tests
//! and single-process deployments that accept that.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use super::errors::QueueResult;
use super::job::{Job, JobCounts};
use super::store::JobStore;
use crate::state_machine::JobState;

#[derive(Debug, Default)]
struct MemoryInner {
    jobs: HashMap<Uuid, Job>,
    /// Ids of queued jobs in enqueue / requeue order
    pending: VecDeque<Uuid>,
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: Mutex<MemoryInner>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &Job) -> QueueResult<()> {
        let mut inner = self.inner.lock();
        if job.state == JobState::Queued {
            inner.pending.push_back(job.id);
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> QueueResult<Option<Job>> {
        let mut inner = self.inner.lock();
        let MemoryInner { jobs, pending } = &mut *inner;

        let position = pending.iter().position(|id| {
            jobs.get(id)
                .is_some_and(|job| job.state == JobState::Queued && job.available_at <= now)
        });

        let Some(position) = position else {
            return Ok(None);
        };
        let Some(id) = pending.remove(position) else {
            return Ok(None);
        };
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };

        job.claim(now)?;
        Ok(Some(job.clone()))
    }

    async fn record_attempt(&self, job: &Job) -> QueueResult<bool> {
        let mut inner = self.inner.lock();

        let current = match inner.jobs.get_mut(&job.id) {
            Some(current) => current,
            None => return Ok(false),
        };
        if current.state != JobState::Active || current.attempts != job.attempts {
            return Ok(false);
        }

        *current = job.clone();
        if job.state == JobState::Queued {
            inner.pending.push_back(job.id);
        }
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> QueueResult<Option<Job>> {
        Ok(self.inner.lock().jobs.get(&id).cloned())
    }

    async fn find_stalled(&self, cutoff: DateTime<Utc>, limit: usize) -> QueueResult<Vec<Job>> {
        let inner = self.inner.lock();
        let mut stalled: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| {
                job.state == JobState::Active && job.started_at.is_some_and(|at| at < cutoff)
            })
            .cloned()
            .collect();
        stalled.sort_by_key(|job| job.started_at);
        stalled.truncate(limit);
        Ok(stalled)
    }

    async fn counts(&self) -> QueueResult<JobCounts> {
        let inner = self.inner.lock();
        let mut counts = JobCounts::default();
        for job in inner.jobs.values() {
            counts.add(job.state, 1);
        }
        Ok(counts)
    }

    async fn health_check(&self) -> QueueResult<bool> {
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }
}
