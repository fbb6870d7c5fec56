//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, request span)
//!     → chat.rs (sessions, single-turn chat) | jobs.rs (polling)
//!     → response.rs (errors as {"error": ...})
//!     → Send to client
//! ```

pub mod chat;
pub mod jobs;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
