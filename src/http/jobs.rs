//! Polling handlers: start a background job, read it back.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::ProtocolAdapter;
use crate::http::chat::parse_message;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::jobs::{JobId, JobRecord, JobStoreError};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub status: String,
    pub job_id: Option<JobId>,
}

/// `POST /api/chat/polling`
pub async fn start_job(State(state): State<AppState>, body: Bytes) -> Result<Json<JobAccepted>, ApiError> {
    let message = parse_message(&body)?;
    let adapter = Arc::new(ProtocolAdapter::from_config(&state.engine)?);
    adapter.connect().await?;

    let ticket = state.jobs.start(adapter, message).await;
    Ok(Json(JobAccepted {
        status: "ok".into(),
        job_id: ticket.id,
    }))
}

/// `GET /api/jobs/{jobId}`
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<JobRecord>, ApiError> {
    let store = state.jobs.store().ok_or(JobStoreError::Unavailable)?;
    let record = store.read_job(&JobId::from(job_id)).await?;
    Ok(Json(record))
}
