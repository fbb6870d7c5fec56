//! engine-bridge
//!
//! Exposes a conversational engine, reachable only over a streaming
//! WebSocket protocol, as a plain HTTP API.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────┐
//!                        │                   ENGINE BRIDGE                   │
//!                        │                                                   │
//!     HTTP Request       │  ┌─────────┐    ┌──────────┐    ┌──────────────┐  │
//!     ───────────────────┼─▶│  http   │───▶│ session  │───▶│   engine     │  │
//!                        │  │ server  │    │ registry │    │   adapter    │──┼──▶ Engine
//!                        │  └────┬────┘    └──────────┘    └──────┬───────┘  │  (WebSocket)
//!                        │       │                               │          │
//!                        │       ▼                               ▼          │
//!                        │  ┌─────────┐                   ┌──────────────┐   │
//!                        │  │  jobs   │──────────────────▶│ turn + done  │   │
//!                        │  │ machine │                   │  detection   │   │
//!                        │  └────┬────┘                   └──────────────┘   │
//!                        │       ▼                                           │
//!                        │  job store (memory | REST)                        │
//!                        └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use engine_bridge::config::load_config;
use engine_bridge::lifecycle::startup;
use engine_bridge::observability::logging;

#[derive(Parser)]
#[command(name = "engine-bridge")]
#[command(about = "HTTP bridge to a WebSocket conversational engine", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a missing .env is normal
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("engine-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        engine_host = %config.engine.host,
        job_store = ?config.job_store.backend,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
