//! HTTP bridge to a conversational engine over WebSocket.

pub mod config;
pub mod engine;
pub mod http;
pub mod jobs;
pub mod lifecycle;
pub mod observability;
pub mod session;

pub use config::schema::BridgeConfig;
pub use engine::ProtocolAdapter;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use session::SessionRegistry;
