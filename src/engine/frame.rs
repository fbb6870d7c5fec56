//! Frame classification and outbound frame encoding.
//!
//! Every frame on the wire is a JSON envelope `{ "action": ..., "data": ... }`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::types::{EngineError, EngineResult};

/// Action tag of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    InitializeAck,
    /// `message` or `response`: a whole, non-chunked reply.
    Message,
    Stream,
    FunctionCall,
    Error,
    Done,
    Unknown,
}

impl Action {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "initialize" | "initialized" => Action::InitializeAck,
            "message" | "response" => Action::Message,
            "stream" => Action::Stream,
            "function_call" => Action::FunctionCall,
            "error" => Action::Error,
            "done" => Action::Done,
            _ => Action::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::InitializeAck => "initialize_ack",
            Action::Message => "message",
            Action::Stream => "stream",
            Action::FunctionCall => "function_call",
            Action::Error => "error",
            Action::Done => "done",
            Action::Unknown => "unknown",
        }
    }
}

/// One parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub action: Action,
    /// The tag exactly as received.
    pub tag: String,
    pub data: Value,
}

impl Frame {
    /// Text carried under `data.message`, or empty.
    pub fn text(&self) -> &str {
        self.data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Function call payload: `data.function` when present, else all of `data`.
    pub fn function(&self) -> Value {
        self.data
            .get("function")
            .cloned()
            .unwrap_or_else(|| self.data.clone())
    }
}

#[derive(Deserialize)]
struct Envelope {
    action: String,
    #[serde(default)]
    data: Value,
}

/// Parse a text payload into a frame.
pub fn classify(raw: &str) -> EngineResult<Frame> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|e| EngineError::Parse(e.to_string()))?;

    Ok(Frame {
        action: Action::from_tag(&envelope.action),
        tag: envelope.action,
        data: envelope.data,
    })
}

/// Parse a binary payload; it must be UTF-8 JSON.
pub fn classify_bytes(raw: &[u8]) -> EngineResult<Frame> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| EngineError::Parse(format!("invalid UTF-8: {}", e)))?;
    classify(text)
}

/// Frame sent to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub action: &'static str,
    pub data: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeData<'a> {
    streaming: bool,
    deployment_type: &'a str,
}

impl OutboundFrame {
    /// Handshake frame. The engine expects `data` as a JSON-encoded string.
    pub fn initialize(deployment_type: &str) -> EngineResult<Self> {
        let data = serde_json::to_string(&InitializeData {
            streaming: true,
            deployment_type,
        })
        .map_err(|e| EngineError::SendFailure(e.to_string()))?;

        Ok(Self {
            action: "initialize",
            data: Value::String(data),
        })
    }

    pub fn message(text: &str) -> Self {
        Self {
            action: "message",
            data: json!({ "message": text }),
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string(self).map_err(|e| EngineError::SendFailure(e.to_string()))
    }
}
