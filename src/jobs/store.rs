//! Job store abstraction and the in-memory backend.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{JobStoreBackend, JobStoreConfig};
use crate::jobs::rest::RestJobStore;
use crate::jobs::types::{JobId, JobRecord, JobStoreError, JobStoreResult, JobUpdate, NewJob};

/// External persistence for job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a job and return the store-assigned id.
    async fn create_job(&self, job: NewJob) -> JobStoreResult<JobId>;

    /// Apply a terminal patch.
    async fn update_job(&self, id: &JobId, update: JobUpdate) -> JobStoreResult<()>;

    async fn read_job(&self, id: &JobId) -> JobStoreResult<JobRecord>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Build the configured store. `Disabled` yields `None`.
pub fn build_store(config: &JobStoreConfig) -> JobStoreResult<Option<Arc<dyn JobStore>>> {
    let store: Arc<dyn JobStore> = match config.backend {
        JobStoreBackend::Disabled => return Ok(None),
        JobStoreBackend::Memory => Arc::new(MemoryJobStore::new()),
        JobStoreBackend::Rest => Arc::new(RestJobStore::from_config(config)?),
    };
    tracing::info!(backend = store.name(), "Job store ready");
    Ok(Some(store))
}

/// Process-local store keyed by a sequential id.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<JobId, JobRecord>,
    next_id: AtomicU64,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, job: NewJob) -> JobStoreResult<JobId> {
        let id = JobId::from(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.jobs.insert(
            id.clone(),
            JobRecord {
                id: id.clone(),
                message: job.message,
                status: job.status,
                response: None,
                error: None,
                created_at: job.created_at,
                updated_at: job.updated_at,
            },
        );
        Ok(id)
    }

    async fn update_job(&self, id: &JobId, update: JobUpdate) -> JobStoreResult<()> {
        let mut record = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;

        record.status = update.status;
        record.updated_at = update.updated_at;
        if update.response.is_some() {
            record.response = update.response;
        }
        if update.error.is_some() {
            record.error = update.error;
        }
        Ok(())
    }

    async fn read_job(&self, id: &JobId) -> JobStoreResult<JobRecord> {
        self.jobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
