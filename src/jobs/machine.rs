//! Job state machine for fire-and-forget requests.
//!
//! # Lifecycle
//! ```text
//! start()  → create record (processing) → return id
//!          └─ background task:
//!               wait for greeting → send → wait (long-form strategy)
//!               → complete | error → update record → disconnect
//! ```
//!
//! Store calls are best-effort: a failure is logged and counted, never
//! retried, and never changes the job's outcome.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::engine::{CompletionReason, CompletionStrategy, ProtocolAdapter, TurnOutcome};
use crate::jobs::store::JobStore;
use crate::jobs::types::{Job, JobId, JobResult, NewJob};
use crate::observability::metrics;

/// Handle to a started job.
pub struct JobTicket {
    /// Store-assigned id; `None` when no store is configured or the insert failed.
    pub id: Option<JobId>,
    /// Resolves to the job's final state.
    pub handle: JoinHandle<Job>,
}

#[derive(Clone)]
pub struct JobStateMachine {
    store: Option<Arc<dyn JobStore>>,
    greeting: CompletionStrategy,
    reply: CompletionStrategy,
}

impl JobStateMachine {
    pub fn new(store: Option<Arc<dyn JobStore>>, greeting: CompletionStrategy, reply: CompletionStrategy) -> Self {
        Self { store, greeting, reply }
    }

    pub fn store(&self) -> Option<&Arc<dyn JobStore>> {
        self.store.as_ref()
    }

    /// Record a new job and drive it in the background over a connected adapter.
    ///
    /// The adapter is disconnected once the job reaches a terminal status.
    pub async fn start(&self, adapter: Arc<ProtocolAdapter>, message: String) -> JobTicket {
        let id = self.create(&message).await;
        metrics::record_job("processing");

        let machine = self.clone();
        let job = Job::new(id.clone(), message);
        let handle = tokio::spawn(async move { machine.run(adapter, job).await });

        JobTicket { id, handle }
    }

    async fn create(&self, message: &str) -> Option<JobId> {
        let Some(store) = &self.store else {
            tracing::warn!("No job store configured, job will not be recorded");
            return None;
        };

        match store.create_job(NewJob::processing(message, Utc::now())).await {
            Ok(id) => {
                tracing::info!(job_id = %id, backend = store.name(), "Job created");
                Some(id)
            }
            Err(e) => {
                metrics::record_job_store_failure("create");
                tracing::error!(backend = store.name(), error = %e, "Failed to record job");
                None
            }
        }
    }

    async fn run(self, adapter: Arc<ProtocolAdapter>, mut job: Job) -> Job {
        let job_id = job.id.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into());

        // let the greeting settle so it is not mistaken for the reply
        adapter.await_turn(self.greeting).await;

        let result = match adapter.send(&job.message).await {
            Ok(()) => {
                let outcome = adapter.await_turn(self.reply).await;
                settle(&mut job, outcome, self.reply)
            }
            Err(e) => job.fail(e.to_string()),
        };
        if let Err(e) = result {
            tracing::error!(job_id = %job_id, error = %e, "Job transition rejected");
        }

        match job.error.as_deref() {
            None => tracing::info!(job_id = %job_id, chars = job.response.as_deref().map_or(0, str::len), "Job complete"),
            Some(error) => tracing::warn!(job_id = %job_id, error = %error, "Job failed"),
        }
        metrics::record_job(job.status.as_str());

        self.persist(&job).await;
        adapter.disconnect().await;
        job
    }

    async fn persist(&self, job: &Job) {
        let (Some(store), Some(id)) = (&self.store, &job.id) else {
            return;
        };
        if let Err(e) = store.update_job(id, job.to_update(Utc::now())).await {
            metrics::record_job_store_failure("update");
            tracing::error!(job_id = %id, backend = store.name(), error = %e, "Failed to update job");
        }
    }
}

/// Map a finished turn onto the job's terminal status.
fn settle(job: &mut Job, outcome: TurnOutcome, strategy: CompletionStrategy) -> JobResult<()> {
    if !outcome.text.is_empty() {
        return job.complete(outcome.text);
    }
    if let Some(error) = outcome.remote_error {
        return job.fail(error);
    }
    match outcome.reason {
        CompletionReason::Disconnected => job.fail("connection closed before reply"),
        CompletionReason::Ceiling => job.fail(format!("no reply within {}s", strategy.ceiling().as_secs())),
        CompletionReason::Terminal | CompletionReason::Content | CompletionReason::Inactivity => job.complete(""),
    }
}
