//! Client for the engine-bridge HTTP API.

pub mod client;

pub use client::{BridgeClient, ChatSession, ClientError, JobAccepted, JobRecord};
