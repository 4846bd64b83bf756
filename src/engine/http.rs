//! # HTTP Engine Client
//!
//! Talks to the analysis engine over HTTP: `POST /analyze` with
//! `{text, options}` and `GET /health`.
//!
//! ## Failure classification
//!
//! | Outcome | Error |
//! |---|---|
//! | timeout, connection refused, no response | `Unavailable` |
//! | 408, 429, any 5xx | `Unavailable` |
//! | other 4xx with a `{detail}` body | `Rejected` with the engine's `detail` |
//! | other 4xx without a `{detail}` body | `Transport` |
//! | request build failure, undecodable 2xx body | `Transport` |

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::EngineError;
use super::traits::AnalysisEngine;
use crate::config::EngineConfig;
use crate::types::{AnalysisRequest, AnalysisResult};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Structured error body returned by the engine
#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    detail: serde_json::Value,
}

/// reqwest-backed [`AnalysisEngine`]
#[derive(Clone)]
pub struct HttpEngineClient {
    client: Client,
    base_url: Url,
    default_timeout: Duration,
}

impl std::fmt::Debug for HttpEngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEngineClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout_ms", &self.default_timeout.as_millis())
            .finish()
    }
}

impl HttpEngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        // A trailing slash keeps any path prefix when joining endpoint names
        let normalized = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            EngineError::transport(format!("Invalid engine URL '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("analysis-orchestrator/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::transport(format!("Failed to create HTTP client: {e}")))?;

        info!(
            base_url = %base_url,
            timeout_ms = config.timeout_ms,
            "Created analysis engine client"
        );

        Ok(Self {
            client,
            base_url,
            default_timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url, EngineError> {
        self.base_url
            .join(path)
            .map_err(|e| EngineError::transport(format!("Invalid URL: {e}")))
    }

    /// Map a send-side reqwest failure onto the engine taxonomy
    fn classify_send_error(error: reqwest::Error) -> EngineError {
        if error.is_builder() {
            EngineError::transport(format!("Request setup error: {error}"))
        } else if error.is_timeout() {
            EngineError::unavailable(format!("no response within timeout: {error}"))
        } else {
            // Connection refused, reset, DNS failure: nothing came back
            EngineError::unavailable(format!("no response from engine: {error}"))
        }
    }

    async fn classify_error_response(response: reqwest::Response) -> EngineError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(status, &body)
    }
}

/// Only a client error carrying the engine's own `{detail}` is a rejection of the input
fn classify_status(status: StatusCode, body: &str) -> EngineError {
    let code = status.as_u16();
    let structured = extract_detail(body);
    let detail = structured.clone().unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body.to_string()
        }
    });

    let transient = status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();

    match structured {
        _ if transient => EngineError::unavailable(format!("engine returned {code}: {detail}")),
        Some(detail) if status.is_client_error() => EngineError::rejected(code, detail),
        _ => EngineError::transport(format!("unexpected engine response {code}: {detail}")),
    }
}

/// Pull `detail` out of a `{"detail": ...}` body; non-string details are kept as JSON text
fn extract_detail(body: &str) -> Option<String> {
    let parsed: EngineErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(detail) => Some(detail),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl AnalysisEngine for HttpEngineClient {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        timeout: Duration,
    ) -> Result<AnalysisResult, EngineError> {
        let url = self.endpoint("analyze")?;

        debug!(
            url = %url,
            text_length = request.char_len(),
            timeout_ms = timeout.as_millis() as u64,
            "Calling analysis engine"
        );

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(Self::classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error = Self::classify_error_response(response).await;
            warn!(status = status.as_u16(), kind = error.kind(), error = %error, "Analysis engine call failed");
            return Err(error);
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::unavailable(format!("response body timed out: {e}"))
            } else {
                EngineError::transport(format!("Failed to decode engine response: {e}"))
            }
        })?;

        debug!(status = status.as_u16(), "Analysis engine call succeeded");
        Ok(AnalysisResult::new(payload))
    }

    async fn health_check(&self) -> bool {
        let url = match self.endpoint("health") {
            Ok(url) => url,
            Err(_) => return false,
        };

        match self
            .client
            .get(url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Analysis engine health check failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
