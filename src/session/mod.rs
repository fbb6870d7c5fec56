//! Chat session subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/chat/session
//!     → registry.rs (new id, connect adapter, register)
//!
//! POST /api/chat/{id}/message, DELETE /api/chat/{id}
//!     → registry.rs (lookup or remove by id)
//!     → engine::ProtocolAdapter
//! ```
//!
//! # Design Decisions
//! - Explicit registry object shared through axum state, no globals
//! - Sharded map so sessions never contend with each other
//! - Unbounded: sessions live until closed or the process shuts down

pub mod registry;

pub use registry::{SessionError, SessionId, SessionRegistry};
