//! Engine connection subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → adapter.rs (connect, initialize, send)
//!     → WebSocket to the remote engine
//!
//! Engine frames
//!     → frame.rs (classify by action tag)
//!     → turn.rs (aggregate fragments into one reply)
//!     → completion.rs (decide when the reply is finished)
//!     → Caller
//! ```
//!
//! # Design Decisions
//! - One adapter per engine connection; sessions and jobs each own one
//! - Turn state lives in a watch channel so waiters wake on every change
//! - Signals fan out over a broadcast channel; nobody listening is not an error

pub mod adapter;
pub mod completion;
pub mod frame;
pub mod turn;
pub mod types;

pub use adapter::ProtocolAdapter;
pub use completion::{CompletionReason, CompletionStrategy, TurnOutcome};
pub use frame::{Action, Frame, OutboundFrame};
pub use turn::{Turn, TurnPhase};
pub use types::{ConnectionId, EngineAddress, EngineError, EngineEvent, EngineResult};
