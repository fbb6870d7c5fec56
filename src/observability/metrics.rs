//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_frames_total` (counter): inbound engine frames by action
//! - `bridge_parse_failures_total` (counter): undecodable engine frames
//! - `bridge_turns_total` (counter): completed turns by completion reason
//! - `bridge_turn_duration_seconds` (histogram): time from wait start to completion
//! - `bridge_active_sessions` (gauge): open chat sessions
//! - `bridge_jobs_total` (counter): jobs reaching a status
//! - `bridge_job_store_failures_total` (counter): failed store calls by operation
//! - `bridge_engine_connections_total` (counter): connection attempts by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Exposition via the Prometheus exporter's own HTTP listener

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_frame(action: &'static str) {
    counter!("bridge_frames_total", "action" => action).increment(1);
}

pub fn record_parse_failure() {
    counter!("bridge_parse_failures_total").increment(1);
}

pub fn record_turn(reason: &'static str, elapsed: Duration) {
    counter!("bridge_turns_total", "reason" => reason).increment(1);
    histogram!("bridge_turn_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn set_active_sessions(count: usize) {
    gauge!("bridge_active_sessions").set(count as f64);
}

pub fn record_job(status: &'static str) {
    counter!("bridge_jobs_total", "status" => status).increment(1);
}

pub fn record_job_store_failure(operation: &'static str) {
    counter!("bridge_job_store_failures_total", "operation" => operation).increment(1);
}

pub fn record_connection(outcome: &'static str) {
    counter!("bridge_engine_connections_total", "outcome" => outcome).increment(1);
}
