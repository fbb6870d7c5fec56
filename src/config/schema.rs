//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Remote conversational engine connection settings.
    pub engine: EngineConfig,

    /// Turn completion timing.
    pub completion: CompletionConfig,

    /// Job store used by the polling endpoint.
    pub job_store: JobStoreConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Remote engine connection settings.
///
/// The three identifiers are injected verbatim into the connection URI.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheme and host, e.g. "wss://engine.example.com".
    pub host: String,

    /// Worker identifier (first path segment).
    pub worker_id: String,

    /// Flow identifier (second path segment).
    pub flow_id: String,

    /// Access credential, sent as the `api_key` query parameter.
    pub api_key: String,

    /// Deployment tag announced in the initialization frame.
    pub deployment_type: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "wss://brainbase-engine-python.onrender.com".to_string(),
            worker_id: String::new(),
            flow_id: String::new(),
            api_key: String::new(),
            deployment_type: "production".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl EngineConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("host", &self.host)
            .field("worker_id", &self.worker_id)
            .field("flow_id", &self.flow_id)
            .field("api_key", &"<redacted>")
            .field("deployment_type", &self.deployment_type)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Turn completion timing.
///
/// These are process-wide constants: callers cannot override them per request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Grace period before a synchronous caller accepts partial content.
    pub grace_ms: u64,

    /// Ceiling for synchronous (request/response) waits, in seconds.
    pub prompt_ceiling_secs: u64,

    /// Ceiling for the engine's greeting after connect, in seconds.
    /// An engine that never greets costs at most this much per connection.
    pub greeting_ceiling_secs: u64,

    /// Quiet window for long-form waits, in milliseconds.
    pub quiet_window_ms: u64,

    /// Ceiling for long-form waits, in seconds.
    pub long_form_ceiling_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            grace_ms: 500,
            prompt_ceiling_secs: 30,
            greeting_ceiling_secs: 5,
            quiet_window_ms: 5_000,
            long_form_ceiling_secs: 300,
        }
    }
}

/// Which job store backs the polling endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStoreBackend {
    /// No store: jobs still run but are not persisted.
    Disabled,
    /// Process-local map.
    Memory,
    /// PostgREST/Supabase compatible REST endpoint.
    Rest,
}

/// Job store configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobStoreConfig {
    pub backend: JobStoreBackend,

    /// Base URL of the REST store (e.g. "https://xyz.supabase.co").
    pub url: String,

    /// Service key for the REST store.
    pub api_key: String,

    /// Table holding job records.
    pub table: String,

    /// REST request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            backend: JobStoreBackend::Memory,
            url: String::new(),
            api_key: String::new(),
            table: "jobs".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for JobStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("table", &self.table)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Timeout configuration for HTTP requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed the prompt ceiling plus connection time.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 90 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Allow cross-origin requests from any origin.
    pub cors_permissive: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
            cors_permissive: true,
        }
    }
}
