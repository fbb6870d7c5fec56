//! Turn aggregation.
//!
//! # Turn Boundaries
//! ```text
//! send()              → opens a caller turn, buffer reset deferred to next content frame
//! stream              → appends to the buffer
//! message / response  → replaces the buffer wholesale, closes the turn
//! done                → emits complete (if buffer non-empty), closes the turn
//! detector fires      → closes the turn
//! error / function_call / unknown → pass through, buffer untouched
//! ```
//!
//! A closed turn keeps its text readable until the next turn starts, so a
//! waiter that wakes after the boundary still sees the reply.

use tokio::time::Instant;

use crate::engine::frame::{Action, Frame};
use crate::engine::types::{EngineError, EngineEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Nothing received since the connection opened.
    Idle,
    /// Content is being accumulated.
    Open,
    /// A boundary was reached; text is the finished reply.
    Finished,
}

/// The single turn of one connection.
#[derive(Debug, Clone)]
pub struct Turn {
    buffer: String,
    phase: TurnPhase,
    /// Opened by a local `send`, as opposed to unsolicited remote content.
    solicited: bool,
    reset_pending: bool,
    fragments: u64,
    last_activity: Instant,
    remote_error: Option<String>,
    closed: bool,
}

impl Default for Turn {
    fn default() -> Self {
        Self::new()
    }
}

impl Turn {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            phase: TurnPhase::Idle,
            solicited: false,
            reset_pending: false,
            fragments: 0,
            last_activity: Instant::now(),
            remote_error: None,
            closed: false,
        }
    }

    /// Open a caller turn. The buffer is not cleared here; the next content
    /// frame does it.
    pub fn begin(&mut self) {
        self.phase = TurnPhase::Open;
        self.solicited = true;
        self.reset_pending = true;
        self.fragments = 0;
        self.remote_error = None;
        self.last_activity = Instant::now();
    }

    /// Close the turn without a terminal frame (detector fired, send failed).
    pub fn finish(&mut self) {
        self.phase = TurnPhase::Finished;
    }

    /// Mark the underlying connection as gone.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Fold one inbound frame into the turn, returning the signals to emit.
    pub fn apply(&mut self, frame: &Frame) -> Vec<EngineEvent> {
        match frame.action {
            Action::Stream => {
                let chunk = frame.text();
                self.start_content();
                self.buffer.push_str(chunk);
                self.record_fragment();
                vec![EngineEvent::Stream(chunk.to_string())]
            }
            Action::Message => {
                let text = frame.text();
                self.start_content();
                self.buffer.clear();
                self.buffer.push_str(text);
                self.record_fragment();
                self.phase = TurnPhase::Finished;
                vec![EngineEvent::Message(text.to_string())]
            }
            Action::Done => {
                let mut events = Vec::with_capacity(2);
                if self.phase == TurnPhase::Open && !self.text().is_empty() {
                    events.push(EngineEvent::Complete(self.text().to_string()));
                }
                self.phase = TurnPhase::Finished;
                self.last_activity = Instant::now();
                events.push(EngineEvent::Done(frame.data.clone()));
                events
            }
            Action::FunctionCall => vec![EngineEvent::FunctionCall(frame.function())],
            Action::Error => {
                let message = frame.text().to_string();
                self.remote_error = Some(message.clone());
                vec![EngineEvent::Error(EngineError::Remote(message))]
            }
            Action::InitializeAck => Vec::new(),
            Action::Unknown => vec![EngineEvent::Unknown {
                action: frame.tag.clone(),
                data: frame.data.clone(),
            }],
        }
    }

    /// Text of the current turn. Empty while a reset is pending.
    pub fn text(&self) -> &str {
        if self.reset_pending {
            ""
        } else {
            &self.buffer
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == TurnPhase::Finished
    }

    /// True while a caller turn waits for its reply; a second send must be refused.
    pub fn is_awaiting_reply(&self) -> bool {
        self.phase == TurnPhase::Open && self.solicited
    }

    /// Content frames received in the current turn.
    pub fn fragments(&self) -> u64 {
        self.fragments
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Most recent remote error reported during this turn.
    pub fn remote_error(&self) -> Option<&str> {
        self.remote_error.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn start_content(&mut self) {
        if self.phase != TurnPhase::Open {
            // unsolicited content: greeting, or a tail after the detector fired
            self.phase = TurnPhase::Open;
            self.solicited = false;
            self.reset_pending = true;
            self.remote_error = None;
        }
        if self.reset_pending {
            self.buffer.clear();
            self.fragments = 0;
            self.reset_pending = false;
        }
    }

    fn record_fragment(&mut self) {
        self.fragments += 1;
        self.last_activity = Instant::now();
    }
}
