//! Session registry: maps session identifiers to live engine adapters.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{EngineError, ProtocolAdapter};
use crate::observability::metrics;

/// Caller-opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Chat session not found: {0}")]
    NotFound(SessionId),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Registry of open chat sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<ProtocolAdapter>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new adapter and register it under a fresh identifier.
    pub async fn open(&self, config: &EngineConfig) -> SessionResult<(SessionId, Arc<ProtocolAdapter>)> {
        let adapter = Arc::new(ProtocolAdapter::from_config(config)?);
        adapter.connect().await?;
        let id = self.register(Arc::clone(&adapter));
        Ok((id, adapter))
    }

    /// Register an already connected adapter.
    pub fn register(&self, adapter: Arc<ProtocolAdapter>) -> SessionId {
        let conn_id = adapter.id();
        let id = loop {
            let id = SessionId::generate();
            // never overwrite a live session
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                slot.insert(adapter);
                break id;
            }
        };

        tracing::info!(session_id = %id, conn_id = %conn_id, "Session opened");
        metrics::set_active_sessions(self.sessions.len());
        id
    }

    pub fn get(&self, id: &SessionId) -> SessionResult<Arc<ProtocolAdapter>> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Disconnect and forget a session. Unknown ids return false.
    pub async fn close(&self, id: &SessionId) -> bool {
        let Some((_, adapter)) = self.sessions.remove(id) else {
            return false;
        };
        adapter.disconnect().await;
        metrics::set_active_sessions(self.sessions.len());
        tracing::info!(session_id = %id, "Session closed");
        true
    }

    /// Disconnect every session. Used during shutdown.
    pub async fn close_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        let mut closed = 0;
        for id in ids {
            if self.close(&id).await {
                closed += 1;
            }
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
