//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the job store and metrics exporter from configuration
//! - Bind the listener and serve until a shutdown signal

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::BridgeConfig;
use crate::http::HttpServer;
use crate::jobs::{build_store, JobStoreError};
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to initialize job store: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Invalid metrics address {0}")]
    MetricsAddress(String),

    #[error("Failed to bind or serve: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the bridge until Ctrl-C or SIGTERM.
pub async fn run(config: BridgeConfig) -> Result<(), StartupError> {
    let job_store = build_store(&config.job_store)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, job_store);
    let serving = tokio::spawn(server.run(listener, shutdown.signal()));

    shutdown_signal().await;
    shutdown.trigger();

    match serving.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "Server task ended abnormally"),
    }
    Ok(())
}
