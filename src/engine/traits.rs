use async_trait::async_trait;
use std::time::Duration;

use super::errors::EngineError;
use crate::types::{AnalysisRequest, AnalysisResult};

/// Request/response contract with the external analysis engine
///
/// Implementations are stateless per call: no retries and no caching happen
/// at this level.
#[async_trait]
pub trait AnalysisEngine: Send + Sync + std::fmt::Debug {
    /// Run one analysis, bounded by `timeout`
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        timeout: Duration,
    ) -> Result<AnalysisResult, EngineError>;

    /// Whether the engine currently answers its health endpoint
    async fn health_check(&self) -> bool;

    fn name(&self) -> &'static str;
}
