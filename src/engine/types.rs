//! Engine-facing types and error definitions.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::config::EngineConfig;

/// Errors that can occur while talking to the remote engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Engine identity is incomplete (worker, flow or credential missing).
    #[error("{0}")]
    Misconfigured(String),

    /// Transport could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation attempted with no live connection.
    #[error("Not connected to engine")]
    NotConnected,

    /// Transport rejected an outbound frame.
    #[error("Send failure: {0}")]
    SendFailure(String),

    /// Inbound payload could not be decoded.
    #[error("Error parsing message from engine: {0}")]
    Parse(String),

    /// Remote explicitly reported an error frame.
    #[error("Remote error: {0}")]
    Remote(String),

    /// A caller-initiated turn is still awaiting its reply.
    #[error("A turn is already in progress on this connection")]
    TurnInProgress,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Signals emitted by a protocol adapter.
///
/// The set is closed so subscribers handle every kind explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A complete, non-chunked reply.
    Message(String),
    /// One fragment of a chunked reply.
    Stream(String),
    /// Aggregated text of a chunked reply, emitted on `done`.
    Complete(String),
    /// Remote asked for a function call; payload passed through untouched.
    FunctionCall(Value),
    /// Transport failure, parse failure or remote-reported error.
    Error(EngineError),
    /// Raw terminal frame with any trailing payload.
    Done(Value),
    /// Frame with an unrecognized action tag.
    Unknown { action: String, data: Value },
    /// Connection closed, locally or by the remote.
    Disconnected,
}

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for an engine connection, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Address of the remote engine: `{host}/{worker}/{flow}?api_key={credential}`.
///
/// `Display` and `Debug` never reveal the credential.
#[derive(Clone)]
pub struct EngineAddress {
    url: String,
    redacted: String,
}

impl EngineAddress {
    /// Build an address, injecting the identifiers verbatim.
    pub fn new(host: &str, worker_id: &str, flow_id: &str, api_key: &str) -> EngineResult<Self> {
        let host = host.trim_end_matches('/');
        let url = format!("{}/{}/{}?api_key={}", host, worker_id, flow_id, api_key);
        url::Url::parse(&url)
            .map_err(|e| EngineError::Connection(format!("invalid engine address: {}", e)))?;

        Ok(Self {
            redacted: format!("{}/{}/{}?api_key=<redacted>", host, worker_id, flow_id),
            url,
        })
    }

    /// Build an address from configuration, rejecting missing identifiers.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        if config.worker_id.is_empty() || config.flow_id.is_empty() || config.api_key.is_empty() {
            return Err(EngineError::Misconfigured(
                "Missing environment variables. Please set WORKER_ID, FLOW_ID, and BRAINBASE_API_KEY."
                    .to_string(),
            ));
        }
        Self::new(&config.host, &config.worker_id, &config.flow_id, &config.api_key)
    }

    /// Full URI including the credential. Do not log.
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for EngineAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl std::fmt::Debug for EngineAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EngineAddress").field(&self.redacted).finish()
    }
}
