//! Aggregated health over the engine, cache and job store
//!
//! Checks run concurrently. A cache outage only degrades the report since
//! the cache fails open; an unreachable engine or job store does too, while
//! the report itself always renders.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::AnalysisCache;
use crate::engine::AnalysisEngine;
use crate::queue::{JobCounts, JobQueue};
use crate::resilience::CircuitState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub client: &'static str,
    pub healthy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub provider: &'static str,
    pub distributed: bool,
    pub healthy: bool,
    pub degraded: bool,
    pub circuit_state: Option<CircuitState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueHealth {
    pub backend: &'static str,
    pub healthy: bool,
    pub durable: bool,
    /// Absent when the store could not be queried
    pub counts: Option<JobCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub engine: EngineHealth,
    pub cache: CacheHealth,
    pub queue: QueueHealth,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

pub async fn check_health(
    engine: &Arc<dyn AnalysisEngine>,
    cache: &AnalysisCache,
    queue: &JobQueue,
) -> HealthReport {
    let (engine_healthy, cache_healthy, queue_health) = tokio::join!(
        engine.health_check(),
        cache.health_check(),
        queue_health(queue),
    );

    let cache_status = cache.status();
    let cache = CacheHealth {
        provider: cache_status.provider,
        distributed: cache_status.distributed,
        healthy: cache_healthy,
        degraded: cache_status.degraded,
        circuit_state: cache_status.circuit_state,
    };

    let all_ok = engine_healthy && cache.healthy && !cache.degraded && queue_health.healthy;

    HealthReport {
        status: if all_ok {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        },
        engine: EngineHealth {
            client: engine.name(),
            healthy: engine_healthy,
        },
        cache,
        queue: queue_health,
        checked_at: Utc::now(),
    }
}

async fn queue_health(queue: &JobQueue) -> QueueHealth {
    let store = queue.store();
    let (reachable, counts) = tokio::join!(store.health_check(), store.counts());

    let (healthy, error) = match reachable {
        Ok(healthy) => (healthy, None),
        Err(e) => (false, Some(e.to_string())),
    };

    QueueHealth {
        backend: store.backend_name(),
        healthy,
        durable: store.is_durable(),
        counts: counts.ok(),
        error,
    }
}
