//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, CORS)
//! - Serve until shutdown, then disconnect every open session

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{BridgeConfig, CompletionConfig, EngineConfig};
use crate::engine::CompletionStrategy;
use crate::http::request::make_request_span;
use crate::http::{chat, jobs};
use crate::jobs::{JobStateMachine, JobStore};
use crate::session::SessionRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineConfig>,
    pub completion: CompletionConfig,
    pub sessions: SessionRegistry,
    pub jobs: JobStateMachine,
}

impl AppState {
    pub fn new(config: &BridgeConfig, job_store: Option<Arc<dyn JobStore>>) -> Self {
        let jobs = JobStateMachine::new(
            job_store,
            CompletionStrategy::greeting(&config.completion),
            CompletionStrategy::long_form(&config.completion),
        );
        Self {
            engine: Arc::new(config.engine.clone()),
            completion: config.completion.clone(),
            sessions: SessionRegistry::new(),
            jobs,
        }
    }
}

/// HTTP front of the bridge.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: &BridgeConfig, job_store: Option<Arc<dyn JobStore>>) -> Self {
        let state = AppState::new(config, job_store);
        let router = Self::build_router(config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BridgeConfig, state: AppState) -> Router {
        let cors = if config.security.cors_permissive {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        };

        Router::new()
            .route("/health", get(health))
            .route("/api/chat", post(chat::single_turn))
            .route("/api/chat/session", post(chat::open_session))
            .route("/api/chat/polling", post(jobs::start_job))
            .route("/api/chat/{session_id}/message", post(chat::send_message))
            .route("/api/chat/{session_id}", delete(chat::close_session))
            .route("/api/jobs/{job_id}", get(jobs::get_job))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(cors),
            )
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.state.sessions
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        let closed = self.state.sessions.close_all().await;
        tracing::info!(sessions_closed = closed, "HTTP server stopped");
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
