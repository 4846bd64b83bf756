use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use analysis_orchestrator::cache::{CacheError, CacheResult, CacheService};
use analysis_orchestrator::{AnalysisEngine, AnalysisRequest, AnalysisResult, EngineError};

/// How the stub engine answers
#[derive(Debug, Clone)]
pub enum StubBehavior {
    Succeed(Value),
    Unavailable,
    Reject { status_code: u16, detail: String },
    /// Never answers; the call ends as unavailable once the timeout elapses
    Hang,
}

/// Engine double with call counting
#[derive(Debug)]
pub struct StubEngine {
    behavior: Mutex<StubBehavior>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl StubEngine {
    pub fn new(behavior: StubBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(payload: Value) -> Arc<Self> {
        Self::new(StubBehavior::Succeed(payload))
    }

    pub fn unavailable() -> Arc<Self> {
        Self::new(StubBehavior::Unavailable)
    }

    pub fn rejecting(status_code: u16, detail: &str) -> Arc<Self> {
        Self::new(StubBehavior::Reject {
            status_code,
            detail: detail.to_string(),
        })
    }

    pub fn hanging() -> Arc<Self> {
        Self::new(StubBehavior::Hang)
    }

    pub fn set_behavior(&self, behavior: StubBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn analyzed_texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }
}

#[async_trait]
impl AnalysisEngine for StubEngine {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        timeout: Duration,
    ) -> Result<AnalysisResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().push(request.text().to_string());

        let behavior = self.behavior.lock().clone();
        match behavior {
            StubBehavior::Succeed(payload) => Ok(AnalysisResult::new(payload)),
            StubBehavior::Unavailable => Err(EngineError::unavailable("connection refused")),
            StubBehavior::Reject {
                status_code,
                detail,
            } => Err(EngineError::rejected(status_code, detail)),
            StubBehavior::Hang => {
                tokio::time::sleep(timeout).await;
                Err(EngineError::unavailable(format!(
                    "no response within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    async fn health_check(&self) -> bool {
        !matches!(*self.behavior.lock(), StubBehavior::Unavailable | StubBehavior::Hang)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Cache backend that fails every operation
#[derive(Debug, Default)]
pub struct FailingCacheService {
    calls: AtomicUsize,
}

impl FailingCacheService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheService for FailingCacheService {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}
