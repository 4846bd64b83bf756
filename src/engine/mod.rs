//! # Analysis Engine Client
//!
//! Contract with the external analysis engine plus the HTTP implementation.
//! Failures are classified so the job queue can tell transient outages
//! (retry) from rejected input (fail immediately).

pub mod errors;
pub mod http;
pub mod traits;

pub use errors::EngineError;
pub use http::HttpEngineClient;
pub use traits::AnalysisEngine;
