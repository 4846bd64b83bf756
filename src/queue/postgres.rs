//! # PostgreSQL Job Store
//!
//! Durable [`JobStore`] over the `analysis_jobs` table. Workers in any number
//! of processes claim jobs with `FOR UPDATE SKIP LOCKED`, so a job is handed
//! to exactly one claimant per attempt without blocking the others.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::errors::{QueueError, QueueResult};
use super::job::{BackoffPolicy, Job, JobCounts};
use super::store::JobStore;
use crate::config::QueueConfig;
use crate::state_machine::JobState;
use crate::types::{AnalysisRequest, AnalysisResult};

/// Schema migrations for the job table
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const JOB_COLUMNS: &str = "id, payload, state, attempts, max_attempts, backoff, result, \
     failure_reason, created_at, updated_at, available_at, started_at, finished_at";

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    payload: Value,
    state: String,
    attempts: i32,
    max_attempts: i32,
    backoff: Value,
    result: Option<Value>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    available_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = QueueError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let payload: AnalysisRequest = serde_json::from_value(row.payload)?;
        let backoff: BackoffPolicy = serde_json::from_value(row.backoff)?;
        let state: JobState = row.state.parse().map_err(QueueError::Serialization)?;

        Ok(Job {
            id: row.id,
            payload,
            state,
            attempts: u32::try_from(row.attempts)
                .map_err(|e| QueueError::Serialization(format!("attempts: {e}")))?,
            max_attempts: u32::try_from(row.max_attempts)
                .map_err(|e| QueueError::Serialization(format!("max_attempts: {e}")))?,
            backoff,
            result: row.result.map(AnalysisResult::new),
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            available_at: row.available_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

fn to_i32(value: u32, field: &str) -> QueueResult<i32> {
    i32::try_from(value).map_err(|e| QueueError::Serialization(format!("{field}: {e}")))
}

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and bring the schema up to date
    pub async fn connect(config: &QueueConfig) -> QueueResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to job queue database");
                QueueError::backend(format!("connect failed: {e}"))
            })?;

        MIGRATOR.run(&pool).await?;

        info!(
            max_connections = config.max_connections,
            "🗄️ Job queue database connected"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn insert(&self, job: &Job) -> QueueResult<()> {
        let payload = serde_json::to_value(&job.payload)?;
        let backoff = serde_json::to_value(job.backoff)?;
        let result = job
            .result
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO analysis_jobs
                (id, payload, state, attempts, max_attempts, backoff, result,
                 failure_reason, created_at, updated_at, available_at, started_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id)
        .bind(payload)
        .bind(job.state.as_str())
        .bind(to_i32(job.attempts, "attempts")?)
        .bind(to_i32(job.max_attempts, "max_attempts")?)
        .bind(backoff)
        .bind(result)
        .bind(&job.failure_reason)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.available_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await?;

        debug!("Job inserted");
        Ok(())
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> QueueResult<Option<Job>> {
        let query = format!(
            r#"
            UPDATE analysis_jobs
            SET state = 'active', attempts = attempts + 1, started_at = $1, updated_at = $1
            WHERE id = (
                SELECT id FROM analysis_jobs
                WHERE state = 'queued' AND available_at <= $1
                ORDER BY available_at, created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from).transpose()
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, attempt = job.attempts, state = %job.state))]
    async fn record_attempt(&self, job: &Job) -> QueueResult<bool> {
        let result = job
            .result
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let outcome = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET state = $2, result = $3, failure_reason = $4, available_at = $5,
                updated_at = $6, finished_at = $7
            WHERE id = $1 AND state = 'active' AND attempts = $8
            "#,
        )
        .bind(job.id)
        .bind(job.state.as_str())
        .bind(result)
        .bind(&job.failure_reason)
        .bind(job.available_at)
        .bind(job.updated_at)
        .bind(job.finished_at)
        .bind(to_i32(job.attempts, "attempts")?)
        .execute(&self.pool)
        .await?;

        let applied = outcome.rows_affected() == 1;
        if !applied {
            debug!("Stale attempt outcome discarded");
        }
        Ok(applied)
    }

    async fn find(&self, id: Uuid) -> QueueResult<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from).transpose()
    }

    async fn find_stalled(&self, cutoff: DateTime<Utc>, limit: usize) -> QueueResult<Vec<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM analysis_jobs \
             WHERE state = 'active' AND started_at < $1 \
             ORDER BY started_at LIMIT $2"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(cutoff)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn counts(&self) -> QueueResult<JobCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM analysis_jobs GROUP BY state")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = JobCounts::default();
        for (state, count) in rows {
            let state: JobState = state.parse().map_err(QueueError::Serialization)?;
            counts.add(state, u64::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }

    async fn health_check(&self) -> QueueResult<bool> {
        let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn is_durable(&self) -> bool {
        true
    }
}
