//! Retry behaviour of queued jobs, observed through lifecycle events

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast;

use analysis_orchestrator::events::{JobLifecycleEvent, JobLifecycleKind};
use analysis_orchestrator::queue::{JobOutcome, JobStatus};
use analysis_orchestrator::AnalysisRequest;
use uuid::Uuid;

/// Collect events for `job_id` until it completes or fails
async fn collect_until_terminal(
    receiver: &mut broadcast::Receiver<JobLifecycleEvent>,
    job_id: Uuid,
) -> Vec<JobLifecycleKind> {
    let mut kinds = Vec::new();
    let collect = async {
        loop {
            match receiver.recv().await {
                Ok(event) if event.job_id == job_id => {
                    let terminal = matches!(
                        event.kind,
                        JobLifecycleKind::Completed { .. } | JobLifecycleKind::Failed { .. }
                    );
                    kinds.push(event.kind);
                    if terminal {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => panic!("event stream broke: {e}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("job did not reach a terminal state");
    kinds
}

#[tokio::test]
async fn exhausted_job_is_started_exactly_max_attempts_times() {
    let engine = StubEngine::unavailable();
    let mut system = memory_system(engine.clone());
    let mut events = system.queue().events().subscribe();

    let job = system
        .queue()
        .enqueue(AnalysisRequest::from_text("The cat").unwrap())
        .await
        .unwrap();
    system.start_workers();

    let kinds = collect_until_terminal(&mut events, job.id).await;
    let started: Vec<u32> = kinds
        .iter()
        .filter_map(|kind| match kind {
            JobLifecycleKind::Started { attempt } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![1, 2, 3]);
    assert_eq!(engine.call_count(), 3);

    match kinds.last() {
        Some(JobLifecycleKind::Failed { attempts, reason }) => {
            assert_eq!(*attempts, 3);
            assert!(reason.contains("connection refused"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    system.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn retry_delays_never_decrease() {
    let mut config = test_config();
    config.queue.max_attempts = 5;
    let engine = StubEngine::unavailable();
    let mut system = memory_system_with(
        engine.clone(),
        std::sync::Arc::new(analysis_orchestrator::cache::InMemoryCacheService::new()),
        config,
    );
    let mut events = system.queue().events().subscribe();

    let job = system
        .queue()
        .enqueue(AnalysisRequest::from_text("The cat").unwrap())
        .await
        .unwrap();
    system.start_workers();

    let kinds = collect_until_terminal(&mut events, job.id).await;
    let delays: Vec<u64> = kinds
        .iter()
        .filter_map(|kind| match kind {
            JobLifecycleKind::RetryScheduled { delay_ms, .. } => Some(*delay_ms),
            _ => None,
        })
        .collect();

    assert_eq!(delays, vec![5, 10, 20, 40]);
    assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(engine.call_count(), 5);

    system.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn rejected_job_fails_after_one_attempt() {
    let engine = StubEngine::rejecting(400, "Text contains no sentences");
    let system = memory_system(engine.clone());

    let job = system
        .queue()
        .enqueue(AnalysisRequest::from_text("...").unwrap())
        .await
        .unwrap();

    let processed = system.queue().process_next().await.unwrap().unwrap();
    assert_eq!(processed.job_id, job.id);
    assert_eq!(processed.attempt, 1);
    assert!(matches!(processed.outcome, JobOutcome::Failed { .. }));

    match system.queue().status(job.id).await.unwrap() {
        JobStatus::Failed { error } => assert!(error.contains("no sentences")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(engine.call_count(), 1);
    assert!(system.queue().process_next().await.unwrap().is_none());
}

#[tokio::test]
async fn transient_failure_then_success_completes() {
    let engine = StubEngine::unavailable();
    let system = memory_system(engine.clone());

    let job = system
        .queue()
        .enqueue(AnalysisRequest::from_text("The cat").unwrap())
        .await
        .unwrap();

    let first = system.queue().process_next().await.unwrap().unwrap();
    assert!(matches!(
        first.outcome,
        JobOutcome::RetryScheduled { attempt: 1, .. }
    ));

    engine.set_behavior(StubBehavior::Succeed(json!({"tokens": []})));
    let status = wait_for_job(&system, job.id).await;
    assert_eq!(
        serde_json::to_value(status).unwrap(),
        json!({"status": "completed", "result": {"tokens": []}})
    );
    assert_eq!(engine.call_count(), 2);
}

/// Drive the queue by hand until the job is terminal
async fn wait_for_job(system: &analysis_orchestrator::AnalysisSystem, job_id: Uuid) -> JobStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        system.queue().process_next().await.unwrap();
        let status = system.queue().status(job_id).await.unwrap();
        if status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn cached_text_completes_without_engine_call() {
    let payload = json!({"tokens": [{"text": "cat"}]});
    let engine = StubEngine::unavailable();
    let system = memory_system(engine.clone());
    let text = text_of_length(12_000);

    let cached = analysis_orchestrator::AnalysisResult::new(payload.clone());
    assert!(system.cache().set(&text, &cached).await);

    let job = system
        .queue()
        .enqueue(AnalysisRequest::from_text(text).unwrap())
        .await
        .unwrap();
    let processed = system.queue().process_next().await.unwrap().unwrap();

    assert_eq!(processed.job_id, job.id);
    assert_eq!(
        processed.outcome,
        JobOutcome::Completed { from_cache: true }
    );
    assert_eq!(engine.call_count(), 0);
    assert_eq!(
        system.queue().status(job.id).await.unwrap(),
        JobStatus::Completed {
            result: cached
        }
    );
}

#[tokio::test]
async fn concurrent_workers_never_double_run_a_job() {
    let engine = StubEngine::succeeding(json!({"tokens": []}));
    let mut config = test_config();
    config.queue.worker_count = 8;
    let mut system = memory_system_with(
        engine.clone(),
        std::sync::Arc::new(analysis_orchestrator::cache::NoOpCacheService::new()),
        config,
    );

    let mut job_ids = Vec::new();
    for i in 0..20 {
        let request = AnalysisRequest::from_text(format!("Sentence number {i}.")).unwrap();
        job_ids.push(system.queue().enqueue(request).await.unwrap().id);
    }
    system.start_workers();

    let statuses = futures::future::join_all(
        job_ids
            .iter()
            .map(|id| wait_for_terminal(system.queue(), *id, Duration::from_secs(5))),
    )
    .await;

    assert!(statuses
        .iter()
        .all(|status| matches!(status, JobStatus::Completed { .. })));
    assert_eq!(engine.call_count(), 20);

    system.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn rate_limited_engine_response_is_retried() {
    use analysis_orchestrator::cache::InMemoryCacheService;
    use analysis_orchestrator::queue::InMemoryJobStore;
    use analysis_orchestrator::{AnalysisSystem, HttpEngineClient};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokens": []})))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.engine.base_url = server.uri();
    config.engine.timeout_ms = 2_000;
    let engine = Arc::new(HttpEngineClient::new(&config.engine).unwrap());
    let system = AnalysisSystem::from_parts(
        config,
        cache_over(Arc::new(InMemoryCacheService::new())),
        engine,
        Arc::new(InMemoryJobStore::new()),
    );

    let job = system
        .queue()
        .enqueue(AnalysisRequest::from_text("The cat").unwrap())
        .await
        .unwrap();

    let first = system.queue().process_next().await.unwrap().unwrap();
    assert!(
        matches!(first.outcome, JobOutcome::RetryScheduled { attempt: 1, .. }),
        "got {:?}",
        first.outcome
    );

    let status = wait_for_job(&system, job.id).await;
    assert!(matches!(status, JobStatus::Completed { .. }), "got {status:?}");
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
}
