//! Job types and error definitions.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Status of a fire-and-forget job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    /// Move forward to `next`. Terminal statuses never change.
    pub fn transition(self, next: JobStatus) -> JobResult<JobStatus> {
        match (self, next) {
            (JobStatus::Processing, _) => Ok(next),
            (from, to) => Err(JobError::InvalidTransition { from, to }),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-assigned job identifier.
///
/// Stores may key jobs by integer or by string; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => JobId(text),
            Raw::Number(number) => JobId(number.to_string()),
        })
    }
}

/// RFC 3339 timestamp as written to the store.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A job as held in the store, in the store's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub message: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Insert payload for a new job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJob {
    pub message: String,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl NewJob {
    pub fn processing(message: impl Into<String>, at: DateTime<Utc>) -> Self {
        let ts = timestamp(at);
        Self {
            message: message.into(),
            status: JobStatus::Processing,
            created_at: ts.clone(),
            updated_at: ts,
        }
    }
}

/// Patch applied when a job reaches a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub response: Option<String>,
    pub error: Option<String>,
    pub updated_at: String,
}

impl JobUpdate {
    /// Render the patch body.
    ///
    /// `columns` lists the columns the store's record actually has; optional
    /// fields outside it are skipped. `None` writes every present field.
    pub fn to_patch(&self, columns: Option<&HashSet<String>>) -> Value {
        let supports = |name: &str| columns.map_or(true, |cols| cols.contains(name));

        let mut patch = Map::new();
        patch.insert("status".into(), Value::String(self.status.as_str().into()));
        patch.insert("updated_at".into(), Value::String(self.updated_at.clone()));
        if let Some(response) = &self.response {
            if supports("response") {
                patch.insert("response".into(), Value::String(response.clone()));
            }
        }
        if let Some(error) = &self.error {
            if supports("error") {
                patch.insert("error".into(), Value::String(error.clone()));
            }
        }
        Value::Object(patch)
    }
}

/// In-process view of one job's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Option<JobId>,
    pub message: String,
    pub status: JobStatus,
    pub response: Option<String>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: Option<JobId>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
            status: JobStatus::Processing,
            response: None,
            error: None,
        }
    }

    pub fn complete(&mut self, response: impl Into<String>) -> JobResult<()> {
        self.status = self.status.transition(JobStatus::Complete)?;
        self.response = Some(response.into());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> JobResult<()> {
        self.status = self.status.transition(JobStatus::Error)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Terminal patch for the store.
    pub fn to_update(&self, at: DateTime<Utc>) -> JobUpdate {
        JobUpdate {
            status: self.status,
            response: self.response.clone(),
            error: self.error.clone(),
            updated_at: timestamp(at),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

pub type JobResult<T> = Result<T, JobError>;

/// Errors raised by a job store backend.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// No store is configured.
    #[error("Job store unavailable")]
    Unavailable,

    #[error("Job store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Job store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Job store returned an unexpected payload: {0}")]
    Decode(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),
}

pub type JobStoreResult<T> = Result<T, JobStoreError>;
