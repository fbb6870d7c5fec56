//! Error responses.
//!
//! Every failure leaves the API as `{"error": "<text>"}` with a status code
//! chosen from the error's kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::engine::EngineError;
use crate::jobs::JobStoreError;
use crate::session::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn message_required() -> Self {
        Self::bad_request("Message is required")
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        let status = match &error {
            EngineError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::TurnInProgress => StatusCode::CONFLICT,
            EngineError::Connection(_)
            | EngineError::NotConnected
            | EngineError::SendFailure(_)
            | EngineError::Parse(_)
            | EngineError::Remote(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, error.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotFound(_) => Self::not_found("Chat session not found"),
            SessionError::Engine(e) => e.into(),
        }
    }
}

impl From<JobStoreError> for ApiError {
    fn from(error: JobStoreError) -> Self {
        match error {
            JobStoreError::Unavailable => Self::new(StatusCode::SERVICE_UNAVAILABLE, "Job store is not configured"),
            JobStoreError::NotFound(_) => Self::not_found("Job not found"),
            other => Self::new(StatusCode::BAD_GATEWAY, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = self.status.as_u16(), error = %self.message, "Request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobId;
    use crate::session::SessionId;

    #[test]
    fn test_engine_error_statuses() {
        let cases = [
            (EngineError::Misconfigured("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (EngineError::TurnInProgress, StatusCode::CONFLICT),
            (EngineError::Connection("refused".into()), StatusCode::BAD_GATEWAY),
            (EngineError::SendFailure("closed".into()), StatusCode::BAD_GATEWAY),
            (EngineError::NotConnected, StatusCode::BAD_GATEWAY),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_session_not_found() {
        let err = ApiError::from(SessionError::NotFound(SessionId::from("abc")));
        assert_eq!(err, ApiError::not_found("Chat session not found"));
    }

    #[test]
    fn test_job_store_errors() {
        assert_eq!(ApiError::from(JobStoreError::Unavailable).status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::from(JobStoreError::NotFound(JobId::from("1"))).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_misconfigured_message_is_passed_through() {
        let err = ApiError::from(EngineError::Misconfigured("Missing environment variables.".into()));
        assert_eq!(err.message, "Missing environment variables.");
    }
}
