//! Chat handlers: sessions and single-turn exchanges.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::{CompletionStrategy, ProtocolAdapter};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::session::SessionId;

const DEFAULT_GREETING: &str = "Connected to chatbot";
const NO_RESPONSE: &str = "No response received";

#[derive(Debug, Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: Option<String>,
}

/// Extract a non-empty `message` from a JSON body.
///
/// Anything else (no body, bad JSON, missing or empty field) is a 400.
pub fn parse_message(body: &[u8]) -> Result<String, ApiError> {
    serde_json::from_slice::<MessageRequest>(body)
        .ok()
        .and_then(|request| request.message)
        .filter(|message| !message.is_empty())
        .ok_or_else(ApiError::message_required)
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpened {
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub message: String,
}

/// `POST /api/chat/session`
pub async fn open_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (session_id, adapter) = state.sessions.open(&state.engine).await?;

    let greeting = adapter.await_turn(CompletionStrategy::greeting(&state.completion)).await;
    let message = if greeting.text.is_empty() {
        DEFAULT_GREETING.to_string()
    } else {
        greeting.text
    };

    Ok((StatusCode::CREATED, Json(SessionOpened { session_id, message })))
}

/// `POST /api/chat/{sessionId}/message`
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let message = parse_message(&body)?;
    let session_id = SessionId::from(session_id);
    let adapter = state.sessions.get(&session_id)?;

    adapter.send(&message).await?;
    let outcome = adapter.await_turn(CompletionStrategy::prompt(&state.completion)).await;
    tracing::debug!(session_id = %session_id, reason = outcome.reason.as_str(), "Session reply ready");

    Ok(Json(ChatReply { response: outcome.text }))
}

/// `DELETE /api/chat/{sessionId}`
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Notice>, ApiError> {
    if !state.sessions.close(&SessionId::from(session_id)).await {
        return Err(ApiError::not_found("Chat session not found"));
    }
    Ok(Json(Notice { message: "Chat session closed successfully".into() }))
}

/// `POST /api/chat`: connect, greet, ask once, disconnect.
pub async fn single_turn(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, ApiError> {
    let message = parse_message(&body)?;
    let adapter = Arc::new(ProtocolAdapter::from_config(&state.engine)?);
    adapter.connect().await?;

    let greeting = CompletionStrategy::greeting(&state.completion);
    let reply = CompletionStrategy::prompt(&state.completion);
    let result = exchange(&adapter, &message, greeting, reply).await;
    adapter.disconnect().await;

    let text = result?;
    let response = if text.is_empty() { NO_RESPONSE.to_string() } else { text };
    Ok(Json(ChatReply { response }))
}

async fn exchange(
    adapter: &ProtocolAdapter,
    message: &str,
    greeting: CompletionStrategy,
    reply: CompletionStrategy,
) -> Result<String, ApiError> {
    adapter.await_turn(greeting).await;
    adapter.send(message).await?;
    Ok(adapter.await_turn(reply).await.text)
}
