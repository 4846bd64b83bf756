//! # Resilience Module
//!
//! Fault isolation for network-backed dependencies. The cache store wraps its
//! backend in a [`CircuitBreaker`] so that a lost connection turns into fast
//! cache misses instead of per-request timeouts.
//!
//! ## Usage
//!
//! ```rust
//! use analysis_orchestrator::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     timeout: Duration::from_secs(30),
//!     success_threshold: 2,
//! };
//!
//! let circuit_breaker = CircuitBreaker::new("cache".to_string(), config);
//!
//! let result = circuit_breaker
//!     .call(|| async { Ok::<&str, String>("PONG") })
//!     .await;
//! assert!(result.is_ok());
//! # }
//! ```

pub mod circuit_breaker;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerMetrics,
    CircuitState,
};
