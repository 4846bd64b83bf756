//! End-to-end dispatch scenarios over in-memory backends and a stub engine

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;

use analysis_orchestrator::queue::JobStatus;
use analysis_orchestrator::{AnalysisError, AnalysisRequest, EngineError, Submission};

#[tokio::test]
async fn short_text_is_analyzed_inline_and_then_served_from_cache() {
    let payload = json!({"tokens": [
        {"text": "The", "pos": "DET"},
        {"text": "cat", "pos": "NOUN"}
    ]});
    let engine = StubEngine::succeeding(payload.clone());
    let system = memory_system(engine.clone());
    let request = AnalysisRequest::from_text("The cat sat on the mat.").unwrap();

    let first = system.dispatcher().submit(request.clone()).await.unwrap();
    assert_eq!(first.result().map(|r| r.as_value()), Some(&payload));
    assert_eq!(engine.call_count(), 1);

    let second = system.dispatcher().submit(request).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(engine.call_count(), 1, "second submission must hit the cache");
}

#[tokio::test]
async fn long_text_is_queued_and_completes_in_background() {
    let payload = json!({"tokens": [{"text": "The"}]});
    let engine = StubEngine::succeeding(payload.clone());
    let mut system = memory_system(engine.clone());
    let request = AnalysisRequest::from_text(text_of_length(15_000)).unwrap();

    let submission = system.dispatcher().submit(request).await.unwrap();
    let handle = match submission {
        Submission::Queued(handle) => handle,
        other => panic!("expected a job handle, got {other:?}"),
    };
    assert_eq!(
        serde_json::to_value(&handle).unwrap()["status"],
        json!("queued")
    );
    assert_eq!(engine.call_count(), 0);

    let before = system.dispatcher().status(handle.job_id).await.unwrap();
    assert!(matches!(before, JobStatus::Queued | JobStatus::Active));

    system.start_workers();
    let after = wait_for_terminal(system.queue(), handle.job_id, Duration::from_secs(5)).await;
    assert_eq!(
        serde_json::to_value(&after).unwrap(),
        json!({"status": "completed", "result": payload})
    );
    assert_eq!(engine.call_count(), 1);

    system.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn engine_that_always_times_out_fails_job_after_three_attempts() {
    let engine = StubEngine::hanging();
    let mut system = memory_system(engine.clone());
    let request = AnalysisRequest::from_text(text_of_length(12_000)).unwrap();

    let handle = match system.dispatcher().submit(request).await.unwrap() {
        Submission::Queued(handle) => handle,
        other => panic!("expected a job handle, got {other:?}"),
    };

    system.start_workers();
    let status = wait_for_terminal(system.queue(), handle.job_id, Duration::from_secs(5)).await;

    match status {
        JobStatus::Failed { error } => assert!(error.contains("unavailable"), "error: {error}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(engine.call_count(), 3);

    let job = system.queue().get_job(handle.job_id).await.unwrap().unwrap();
    assert_eq!(job.attempts, 3);

    system.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn text_at_threshold_stays_synchronous() {
    let engine = StubEngine::succeeding(json!({"tokens": []}));
    let system = memory_system(engine.clone());
    let request = AnalysisRequest::from_text(text_of_length(10_000)).unwrap();

    let submission = system.dispatcher().submit(request).await.unwrap();
    assert!(submission.result().is_some());
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn threshold_counts_characters_not_bytes() {
    let engine = StubEngine::succeeding(json!({"tokens": []}));
    let system = memory_system(engine.clone());
    // 10,000 characters but 20,000 bytes
    let text: String = "é".repeat(10_000);
    let request = AnalysisRequest::from_text(text).unwrap();

    assert!(!system.dispatcher().is_async(&request));
}

#[tokio::test]
async fn failing_cache_backend_never_reaches_the_caller() {
    let payload = json!({"tokens": [{"text": "cat"}]});
    let engine = StubEngine::succeeding(payload.clone());
    let cache_backend = FailingCacheService::new();
    let system = memory_system_with(engine.clone(), cache_backend.clone(), test_config());
    let request = AnalysisRequest::from_text("The cat").unwrap();

    for _ in 0..2 {
        let submission = system.dispatcher().submit(request.clone()).await.unwrap();
        assert_eq!(submission.result().map(|r| r.as_value()), Some(&payload));
    }

    // Nothing could be cached, so both calls reached the engine
    assert_eq!(engine.call_count(), 2);
    assert!(cache_backend.call_count() >= 4);
}

#[tokio::test]
async fn inline_engine_unavailability_propagates_without_retry() {
    let engine = StubEngine::unavailable();
    let system = memory_system(engine.clone());
    let request = AnalysisRequest::from_text("The cat").unwrap();

    let err = system.dispatcher().submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Engine(EngineError::Unavailable { .. })
    ));
    assert_eq!(err.status_code(), 503);
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn inline_rejection_is_surfaced_verbatim() {
    let engine = StubEngine::rejecting(422, "Unsupported language");
    let system = memory_system(engine.clone());
    let request = AnalysisRequest::from_text("Der Hund").unwrap();

    let err = system.dispatcher().submit(request).await.unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert!(err.to_string().contains("Unsupported language"));
}

#[tokio::test]
async fn unknown_job_reports_not_found() {
    let system = memory_system(StubEngine::unavailable());
    let status = system
        .dispatcher()
        .status(uuid::Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(serde_json::to_value(status).unwrap(), json!({"status": "not_found"}));
}

#[tokio::test]
async fn health_report_reflects_engine_state() {
    let engine = StubEngine::succeeding(json!({}));
    let system = memory_system(engine.clone());
    assert!(system.health().await.is_ok());

    engine.set_behavior(StubBehavior::Unavailable);
    let report = system.health().await;
    assert!(!report.is_ok());
    assert!(!report.engine.healthy);
    assert!(report.queue.healthy);
    assert!(!report.queue.durable);
}
