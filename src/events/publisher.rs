use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobLifecycleKind {
    Enqueued,
    Started { attempt: u32 },
    Completed { from_cache: bool },
    RetryScheduled {
        attempt: u32,
        delay_ms: u64,
        reason: String,
    },
    Failed { attempts: u32, reason: String },
    Stalled { attempt: u32 },
}

impl JobLifecycleKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Started { .. } => "started",
            Self::Completed { .. } => "completed",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::Failed { .. } => "failed",
            Self::Stalled { .. } => "stalled",
        }
    }
}

/// Job state-change notification
#[derive(Debug, Clone, Serialize)]
pub struct JobLifecycleEvent {
    pub job_id: Uuid,
    #[serde(flatten)]
    pub kind: JobLifecycleKind,
    pub published_at: DateTime<Utc>,
}

/// Broadcast publisher for job lifecycle events
///
/// Publishing never fails and never blocks: with no subscribers the event is
/// dropped, and slow subscribers lag rather than stall the workers.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<JobLifecycleEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, job_id: Uuid, kind: JobLifecycleKind) {
        let event = JobLifecycleEvent {
            job_id,
            kind,
            published_at: Utc::now(),
        };

        // send() only errors when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!(job_id = %job_id, "No lifecycle subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobLifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Log every lifecycle event until the publisher is dropped
pub fn spawn_event_logger(publisher: &EventPublisher) -> JoinHandle<()> {
    let mut receiver = publisher.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Lifecycle event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Lifecycle event logger stopped");
    })
}

fn log_event(event: &JobLifecycleEvent) {
    let job_id = event.job_id;
    match &event.kind {
        JobLifecycleKind::Enqueued => info!(job_id = %job_id, "📥 Job enqueued"),
        JobLifecycleKind::Started { attempt } => {
            info!(job_id = %job_id, attempt = attempt, "▶️ Job started")
        }
        JobLifecycleKind::Completed { from_cache } => {
            info!(job_id = %job_id, from_cache = from_cache, "✅ Job completed")
        }
        JobLifecycleKind::RetryScheduled {
            attempt,
            delay_ms,
            reason,
        } => info!(
            job_id = %job_id,
            attempt = attempt,
            delay_ms = delay_ms,
            reason = %reason,
            "🔄 Job retry scheduled"
        ),
        JobLifecycleKind::Failed { attempts, reason } => {
            warn!(job_id = %job_id, attempts = attempts, reason = %reason, "❌ Job failed")
        }
        JobLifecycleKind::Stalled { attempt } => {
            warn!(job_id = %job_id, attempt = attempt, "⏳ Job stalled")
        }
    }
}
