//! # Orchestrator Configuration
//!
//! Configuration for the engine client, cache store, job queue and dispatcher.
//!
//! ## Sources
//!
//! Values are layered by [`ConfigLoader`]: serde defaults, then an optional
//! TOML file, then `ANALYSIS__SECTION__KEY` environment variables. The legacy
//! variables `NLP_SERVICE_URL`, `REDIS_URL` and `DATABASE_URL` override the
//! matching URLs last.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use analysis_orchestrator::config::OrchestratorConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::load()?;
//!
//! let timeout = config.engine.timeout();
//! let threshold = config.dispatch.sync_threshold;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

use crate::resilience::CircuitBreakerConfig;
use crate::validation::DEFAULT_MAX_TEXT_LENGTH;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// External analysis engine connection
    pub engine: EngineConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Background job queue settings
    pub queue: QueueConfig,

    /// Sync/async dispatch decision
    pub dispatch: DispatchConfig,

    /// Shell-side request validation limits
    pub validation: ValidationConfig,
}

/// External analysis engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    /// Ceiling for a single analysis call
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Cache store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false the cache runs with the no-op provider
    pub enabled: bool,
    pub redis_url: String,
    /// Default expiry for cached analysis results
    pub ttl_seconds: u64,
    /// Upper bound on a single backend round trip
    pub operation_timeout_ms: u64,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://localhost:6379".to_string(),
            ttl_seconds: 3600,
            operation_timeout_ms: 500,
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Circuit breaker thresholds, in config-file units
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 30,
            success_threshold: 2,
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        CircuitBreakerConfig {
            failure_threshold: settings.failure_threshold,
            timeout: Duration::from_secs(settings.timeout_seconds),
            success_threshold: settings.success_threshold,
        }
    }
}

/// Job queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub max_attempts: u32,
    /// Base of the exponential retry delay
    pub backoff_base_delay_ms: u64,
    pub worker_count: usize,
    /// Idle wait between polls when no job is ready
    pub poll_interval_ms: u64,
    /// Jobs active longer than this are considered abandoned by their worker
    pub stalled_timeout_seconds: u64,
    /// Capacity of the lifecycle event channel
    pub event_channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/analysis_development".to_string(),
            max_connections: 10,
            max_attempts: 3,
            backoff_base_delay_ms: 2000,
            worker_count: 4,
            poll_interval_ms: 250,
            stalled_timeout_seconds: 300,
            event_channel_capacity: 1000,
        }
    }
}

impl QueueConfig {
    pub fn backoff_base_delay(&self) -> Duration {
        Duration::from_millis(self.backoff_base_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stalled_timeout(&self) -> Duration {
        Duration::from_secs(self.stalled_timeout_seconds)
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Texts longer than this many characters go through the job queue
    pub sync_threshold: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sync_threshold: 10_000,
        }
    }
}

/// Request validation limits applied by the shell
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_text_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }
}

impl OrchestratorConfig {
    /// Load from the file named by `ANALYSIS_CONFIG_PATH` (if any) plus the process environment
    pub fn load() -> ConfigResult<Self> {
        ConfigLoader::from_env().load()
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.base_url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "engine.base_url",
                "engine configuration",
            ));
        }

        if self.engine.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.timeout_ms",
                "0",
                "engine timeout must be greater than 0",
            ));
        }

        if self.cache.enabled && self.cache.redis_url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "cache.redis_url",
                "cache configuration (cache.enabled = true)",
            ));
        }

        if self.cache.operation_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.operation_timeout_ms",
                "0",
                "cache operation timeout must be greater than 0",
            ));
        }

        if self.queue.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.max_attempts",
                "0",
                "a job needs at least one attempt",
            ));
        }

        if self.queue.worker_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.worker_count",
                "0",
                "worker count must be greater than 0",
            ));
        }

        if self.queue.event_channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.event_channel_capacity",
                "0",
                "event channel capacity must be greater than 0",
            ));
        }

        // A running attempt must not look stalled while its engine call can still succeed
        if self.queue.stalled_timeout_seconds.saturating_mul(1000) <= self.engine.timeout_ms {
            return Err(ConfigurationError::invalid_value(
                "queue.stalled_timeout_seconds",
                self.queue.stalled_timeout_seconds.to_string(),
                format!(
                    "stalled timeout must exceed engine.timeout_ms ({}ms)",
                    self.engine.timeout_ms
                ),
            ));
        }

        if self.dispatch.sync_threshold > self.validation.max_text_length {
            return Err(ConfigurationError::invalid_value(
                "dispatch.sync_threshold",
                self.dispatch.sync_threshold.to_string(),
                "sync threshold cannot exceed validation.max_text_length",
            ));
        }

        Ok(())
    }
}
