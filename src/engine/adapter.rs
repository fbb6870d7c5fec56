//! Protocol adapter: owns one engine connection.
//!
//! # Responsibilities
//! - Open the WebSocket and perform the initialization handshake
//! - Transmit `message` frames, one caller turn at a time
//! - Run the reader task feeding frames through classifier and aggregator
//! - Publish engine signals and turn state to waiters
//! - Close the connection idempotently
//!
//! # Data Flow
//! ```text
//! Engine ── WebSocket frames ──▶ reader task ──▶ frame::classify
//!                                                   │
//!                                                   ▼
//!                                  Turn::apply (watch channel) ──▶ completion waiters
//!                                                   │
//!                                                   ▼
//!                                        EngineEvent (broadcast) ──▶ subscribers
//! ```

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::EngineConfig;
use crate::engine::completion::{await_completion, CompletionStrategy, TurnOutcome};
use crate::engine::frame::{self, Action, Frame, OutboundFrame};
use crate::engine::turn::Turn;
use crate::engine::types::{ConnectionId, EngineAddress, EngineError, EngineEvent, EngineResult};
use crate::observability::metrics;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the event broadcast; slow subscribers lag rather than block the reader.
const EVENT_CAPACITY: usize = 256;

/// State shared between the adapter and its reader task.
struct Shared {
    turn: watch::Sender<Turn>,
    events: broadcast::Sender<EngineEvent>,
    connected: AtomicBool,
}

impl Shared {
    fn emit(&self, event: EngineEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Mark the connection dead. Returns false if it already was.
    fn mark_closed(&self) -> bool {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.turn.send_modify(Turn::close);
        self.emit(EngineEvent::Disconnected);
        true
    }
}

/// Closes the current turn when dropped, so an abandoned wait cannot leave it open.
struct FinishOnDrop<'a>(&'a watch::Sender<Turn>);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_modify(Turn::finish);
    }
}

struct Connection {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
}

/// Adapter between callers and one duplex engine connection.
pub struct ProtocolAdapter {
    id: ConnectionId,
    address: EngineAddress,
    deployment_type: String,
    connect_timeout: Duration,
    shared: Arc<Shared>,
    connection: Mutex<Option<Connection>>,
}

impl ProtocolAdapter {
    pub fn new(address: EngineAddress, deployment_type: impl Into<String>, connect_timeout: Duration) -> Self {
        let (turn, _) = watch::channel(Turn::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            id: ConnectionId::new(),
            address,
            deployment_type: deployment_type.into(),
            connect_timeout,
            shared: Arc::new(Shared {
                turn,
                events,
                connected: AtomicBool::new(false),
            }),
            connection: Mutex::new(None),
        }
    }

    /// Build an unconnected adapter from configuration.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let address = EngineAddress::from_config(config)?;
        Ok(Self::new(address, config.deployment_type.clone(), config.connect_timeout()))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn address(&self) -> &EngineAddress {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Subscribe to engine signals emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// Observe the current turn.
    pub fn watch_turn(&self) -> watch::Receiver<Turn> {
        self.shared.turn.subscribe()
    }

    /// Open the connection and send the initialization frame.
    ///
    /// Returns once the handshake frame is on the wire. Calling it on a live
    /// connection is a no-op.
    pub async fn connect(&self) -> EngineResult<()> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() && self.is_connected() {
            return Ok(());
        }

        let stream = match timeout(self.connect_timeout, connect_async(self.address.as_str())).await {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                metrics::record_connection("failed");
                tracing::warn!(conn_id = %self.id, address = %self.address, error = %e, "Engine connection failed");
                return Err(EngineError::Connection(e.to_string()));
            }
            Err(_) => {
                metrics::record_connection("timeout");
                tracing::warn!(conn_id = %self.id, address = %self.address, "Engine connection timed out");
                return Err(EngineError::Connection(format!(
                    "timed out after {}s",
                    self.connect_timeout.as_secs()
                )));
            }
        };

        let (mut sink, stream) = stream.split();
        let init = OutboundFrame::initialize(&self.deployment_type)?.to_json()?;
        if let Err(e) = sink.send(Message::Text(init.into())).await {
            metrics::record_connection("failed");
            return Err(EngineError::Connection(format!("initialization failed: {}", e)));
        }
        tracing::debug!(conn_id = %self.id, deployment_type = %self.deployment_type, "Initialization frame sent");

        // a fresh connection starts with a fresh turn
        self.shared.turn.send_replace(Turn::new());
        self.shared.connected.store(true, Ordering::SeqCst);
        let reader = tokio::spawn(read_loop(self.id, stream, Arc::clone(&self.shared)));
        *guard = Some(Connection { sink, reader });

        metrics::record_connection("established");
        tracing::info!(conn_id = %self.id, address = %self.address, "Connected to engine");
        Ok(())
    }

    /// Send a user message, opening a new caller turn.
    pub async fn send(&self, text: &str) -> EngineResult<()> {
        let mut guard = self.connection.lock().await;
        let connection = match guard.as_mut() {
            Some(connection) if self.is_connected() => connection,
            _ => return Err(EngineError::NotConnected),
        };

        let payload = OutboundFrame::message(text).to_json()?;

        let mut in_progress = false;
        self.shared.turn.send_if_modified(|turn| {
            if turn.is_awaiting_reply() {
                in_progress = true;
                false
            } else {
                turn.begin();
                true
            }
        });
        if in_progress {
            return Err(EngineError::TurnInProgress);
        }

        if let Err(e) = connection.sink.send(Message::Text(payload.into())).await {
            self.shared.turn.send_modify(Turn::finish);
            tracing::warn!(conn_id = %self.id, error = %e, "Failed to send message");
            return Err(EngineError::SendFailure(e.to_string()));
        }

        tracing::debug!(conn_id = %self.id, chars = text.len(), "Message sent");
        Ok(())
    }

    /// Wait for the current turn to complete, then close it.
    ///
    /// The turn is also closed if this future is dropped before it resolves,
    /// so a caller that goes away never blocks the next `send`.
    pub async fn await_turn(&self, strategy: CompletionStrategy) -> TurnOutcome {
        let finish = FinishOnDrop(&self.shared.turn);
        let mut rx = self.shared.turn.subscribe();
        let outcome = await_completion(&mut rx, strategy).await;
        drop(finish);

        metrics::record_turn(outcome.reason.as_str(), outcome.elapsed);
        tracing::debug!(
            conn_id = %self.id,
            reason = outcome.reason.as_str(),
            chars = outcome.text.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Turn completed"
        );
        outcome
    }

    /// Close the connection. Safe to call repeatedly or before `connect`.
    pub async fn disconnect(&self) {
        let connection = self.connection.lock().await.take();
        if let Some(mut connection) = connection {
            if let Err(e) = connection.sink.close().await {
                tracing::debug!(conn_id = %self.id, error = %e, "Error while closing engine socket");
            }
            connection.reader.abort();
        }

        if self.shared.mark_closed() {
            tracing::info!(conn_id = %self.id, "Disconnected from engine");
        }
    }
}

impl Drop for ProtocolAdapter {
    fn drop(&mut self) {
        // stop the reader so the socket is released with the adapter
        if let Some(connection) = self.connection.get_mut().take() {
            connection.reader.abort();
        }
    }
}

impl std::fmt::Debug for ProtocolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolAdapter")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .finish()
    }
}

async fn read_loop(id: ConnectionId, mut stream: SplitStream<WsStream>, shared: Arc<Shared>) {
    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Text(text)) => dispatch(id, &shared, frame::classify(text.as_str())),
            Ok(Message::Binary(bytes)) => dispatch(id, &shared, frame::classify_bytes(&bytes)),
            Ok(Message::Close(close)) => {
                tracing::debug!(conn_id = %id, frame = ?close, "Engine sent close frame");
                break;
            }
            // ping/pong are answered by tungstenite
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "Engine transport error");
                shared.emit(EngineEvent::Error(EngineError::Connection(e.to_string())));
                break;
            }
        }
    }

    if shared.mark_closed() {
        tracing::info!(conn_id = %id, "Engine connection closed");
    }
}

fn dispatch(id: ConnectionId, shared: &Shared, parsed: EngineResult<Frame>) {
    let frame = match parsed {
        Ok(frame) => frame,
        Err(error) => {
            metrics::record_parse_failure();
            tracing::warn!(conn_id = %id, error = %error, "Dropping malformed engine frame");
            shared.emit(EngineEvent::Error(error));
            return;
        }
    };

    metrics::record_frame(frame.action.as_str());
    match frame.action {
        Action::InitializeAck => tracing::debug!(conn_id = %id, "Engine acknowledged initialization"),
        Action::Error => tracing::warn!(conn_id = %id, message = frame.text(), "Engine reported an error"),
        Action::Unknown => tracing::debug!(conn_id = %id, action = %frame.tag, "Unrecognized engine action"),
        _ => tracing::trace!(conn_id = %id, action = frame.action.as_str(), "Engine frame"),
    }

    let mut events = Vec::new();
    shared.turn.send_modify(|turn| events = turn.apply(&frame));
    for event in events {
        shared.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_adapter() -> ProtocolAdapter {
        // port 9 (discard) on localhost is closed in test environments
        let address = EngineAddress::new("ws://127.0.0.1:9", "w", "f", "k").unwrap();
        ProtocolAdapter::new(address, "test", Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let adapter = unreachable_adapter();
        assert_eq!(adapter.send("hello").await, Err(EngineError::NotConnected));
    }

    #[tokio::test]
    async fn test_disconnect_never_connected_is_noop() {
        let adapter = unreachable_adapter();
        let mut events = adapter.subscribe();
        adapter.disconnect().await;
        adapter.disconnect().await;
        assert!(!adapter.is_connected());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let adapter = unreachable_adapter();
        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(err, EngineError::Connection(_)), "{:?}", err);
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_from_config_requires_identity() {
        let err = ProtocolAdapter::from_config(&EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Misconfigured(_)));
    }
}
