#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Analysis Orchestrator
//!
//! Request dispatch in front of a slow, occasionally unreliable text-analysis
//! engine.
//!
//! ## Overview
//!
//! Repeated work is short-circuited by a content-addressable cache keyed on a
//! SHA-256 digest of the text. Large inputs are handed to a durable job queue
//! with exponential-backoff retries, so no caller waits on the engine longer
//! than the configured ceiling.
//!
//! ## Module Organization
//!
//! - [`dispatcher`] - Sync/async decision and the cache-aside inline path
//! - [`cache`] - Fail-open result cache over Redis, memory or nothing
//! - [`engine`] - External engine contract and HTTP client
//! - [`queue`] - Job store, job execution and the worker pool
//! - [`state_machine`] - Job lifecycle transitions
//! - [`events`] - Job lifecycle notifications
//! - [`resilience`] - Circuit breaker guarding the cache backend
//! - [`bootstrap`] - Wiring and lifecycle of the whole system
//! - [`config`] - Layered configuration
//! - [`validation`] - Request checks for the HTTP shell
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use analysis_orchestrator::{AnalysisRequest, AnalysisSystem, OrchestratorConfig, Submission};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::load()?;
//! let mut system = AnalysisSystem::connect(config).await?;
//! system.start_workers();
//!
//! let request = AnalysisRequest::from_text("The cat sat on the mat.")?;
//! match system.dispatcher().submit(request).await? {
//!     Submission::Completed(result) => println!("{}", result.as_value()),
//!     Submission::Queued(handle) => println!("poll job {}", handle.job_id),
//! }
//!
//! system.shutdown(std::time::Duration::from_secs(10)).await;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod health;
pub mod logging;
pub mod queue;
pub mod resilience;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use bootstrap::{AnalysisSystem, SystemStatus};
pub use cache::AnalysisCache;
pub use config::{ConfigLoader, ConfigurationError, OrchestratorConfig};
pub use dispatcher::{Dispatcher, DispatcherSettings, JobHandle, Submission};
pub use engine::{AnalysisEngine, EngineError, HttpEngineClient};
pub use error::{AnalysisError, Result};
pub use health::{HealthReport, HealthStatus};
pub use queue::{Job, JobQueue, JobStatus, QueueError};
pub use state_machine::JobState;
pub use types::{AnalysisOptions, AnalysisRequest, AnalysisResult, CacheKey};
pub use validation::{validate_request, ValidationError};
