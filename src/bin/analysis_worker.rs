//! Analysis Worker Binary
//!
//! Connects the orchestrator, runs the job worker pool until Ctrl-C, then
//! shuts down gracefully.

use anyhow::Context;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use analysis_orchestrator::logging::init_structured_logging;
use analysis_orchestrator::{AnalysisSystem, OrchestratorConfig};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = OrchestratorConfig::load().context("failed to load configuration")?;
    info!(
        engine_url = %config.engine.base_url,
        workers = config.queue.worker_count,
        max_attempts = config.queue.max_attempts,
        "Starting analysis worker"
    );

    let mut system = AnalysisSystem::connect(config)
        .await
        .context("failed to connect analysis orchestrator")?;
    system.start_workers();

    let health = system.health().await;
    info!(status = ?health.status, "Initial health check");

    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    system.shutdown(SHUTDOWN_TIMEOUT).await;
    Ok(())
}
