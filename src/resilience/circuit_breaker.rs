//! # Circuit Breaker Implementation
//!
//! Classic three-state breaker: Closed (normal operation), Open (failing fast)
//! and Half-Open (testing recovery).

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

/// Thresholds controlling when the circuit opens and closes
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub timeout: Duration,
    /// Successful trial calls needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Call counters for a single breaker
#[derive(Debug, Clone, Default, Serialize)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub rejected_count: u64,
    pub consecutive_failures: u64,
    /// Trial calls let through since the circuit last went half-open
    pub half_open_admitted: u64,
    pub half_open_successes: u64,
}

#[derive(Debug, Default)]
struct BreakerInner {
    metrics: CircuitBreakerMetrics,
    opened_at: Option<Instant>,
    half_opened_at: Option<Instant>,
}

/// Circuit breaker with an atomic state mirror and one lock around every transition
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging
    name: String,
    /// Written only while `inner` is locked; read lock-free by `state()`
    state: AtomicU8,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            timeout_seconds = config.timeout.as_secs(),
            success_threshold = config.success_threshold,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_admit() {
            self.inner.lock().metrics.rejected_count += 1;
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let start_time = Instant::now();
        let result = operation().await;
        let duration = start_time.elapsed();

        match &result {
            Ok(_) => self.record_success(duration),
            Err(_) => self.record_failure(duration),
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Decide whether a call may run, reserving a trial slot when half-open
    ///
    /// At most `success_threshold` trial calls are in flight per half-open window.
    /// A window whose trial calls never report back is reopened for new ones
    /// once `timeout` has passed.
    fn try_admit(&self) -> bool {
        let mut inner = self.inner.lock();
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => match inner.opened_at {
                Some(opened) if opened.elapsed() >= self.config.timeout => {
                    self.enter_half_open(&mut inner);
                    inner.metrics.half_open_admitted = 1;
                    true
                }
                Some(_) => false,
                None => {
                    warn!(component = %self.name, "Circuit open but no timestamp recorded");
                    true
                }
            },
            CircuitState::HalfOpen => {
                let window_expired = inner
                    .half_opened_at
                    .is_some_and(|since| since.elapsed() >= self.config.timeout);
                if window_expired {
                    self.enter_half_open(&mut inner);
                }
                if inner.metrics.half_open_admitted < u64::from(self.config.success_threshold) {
                    inner.metrics.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.success_count += 1;

        match self.state() {
            CircuitState::HalfOpen => {
                inner.metrics.half_open_successes += 1;
                if inner.metrics.half_open_successes >= u64::from(self.config.success_threshold) {
                    self.close(&mut inner);
                }
            }
            CircuitState::Closed => inner.metrics.consecutive_failures = 0,
            // A call admitted before another trial call failed
            CircuitState::Open => {}
        }

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🟢 Operation succeeded"
        );
    }

    fn record_failure(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.failure_count += 1;

        let open = match self.state() {
            CircuitState::Closed => {
                inner.metrics.consecutive_failures += 1;
                inner.metrics.consecutive_failures >= u64::from(self.config.failure_threshold)
            }
            // Any failure while probing re-opens the circuit
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🔴 Operation failed"
        );

        if open {
            self.open(&mut inner);
        }
    }

    fn close(&self, inner: &mut BreakerInner) {
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        inner.metrics.consecutive_failures = 0;
        inner.metrics.half_open_admitted = 0;
        inner.metrics.half_open_successes = 0;
        inner.opened_at = None;
        inner.half_opened_at = None;

        info!(
            component = %self.name,
            total_calls = inner.metrics.total_calls,
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    fn open(&self, inner: &mut BreakerInner) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        inner.opened_at = Some(Instant::now());
        inner.half_opened_at = None;
        inner.metrics.half_open_admitted = 0;
        inner.metrics.half_open_successes = 0;

        error!(
            component = %self.name,
            consecutive_failures = inner.metrics.consecutive_failures,
            failure_threshold = self.config.failure_threshold,
            timeout_seconds = self.config.timeout.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    fn enter_half_open(&self, inner: &mut BreakerInner) {
        self.state
            .store(CircuitState::HalfOpen as u8, Ordering::Release);
        inner.half_opened_at = Some(Instant::now());
        inner.metrics.half_open_admitted = 0;
        inner.metrics.half_open_successes = 0;

        info!(
            component = %self.name,
            success_threshold = self.config.success_threshold,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        self.inner.lock().metrics.clone()
    }
}
