//! Shared utilities for integration tests: a scripted mock engine and a
//! bridge launcher.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use engine_bridge::config::{BridgeConfig, EngineConfig};
use engine_bridge::http::HttpServer;
use engine_bridge::jobs::JobStore;
use engine_bridge::lifecycle::Shutdown;

/// One scripted action of the mock engine.
#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Binary(Vec<u8>),
    Pause(Duration),
    Close,
}

pub fn stream(text: &str) -> Step {
    Step::Text(json!({"action": "stream", "data": {"message": text}}).to_string())
}

pub fn message(text: &str) -> Step {
    Step::Text(json!({"action": "message", "data": {"message": text}}).to_string())
}

pub fn error(text: &str) -> Step {
    Step::Text(json!({"action": "error", "data": {"message": text}}).to_string())
}

pub fn done() -> Step {
    Step::Text(json!({"action": "done", "data": {}}).to_string())
}

pub fn pause(ms: u64) -> Step {
    Step::Pause(Duration::from_millis(ms))
}

/// What the engine does after `initialize` and after each `message`.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub greeting: Vec<Step>,
    pub reply: Vec<Step>,
}

/// Mock engine speaking the bridge's WebSocket protocol.
pub struct MockEngine {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
}

impl MockEngine {
    /// Start on an ephemeral port; every connection follows `script`.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let script = script.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(socket).await else {
                        return;
                    };
                    let (mut sink, mut stream) = ws.split();

                    while let Some(Ok(frame)) = stream.next().await {
                        let Message::Text(text) = frame else {
                            continue;
                        };
                        let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                            continue;
                        };
                        let action = value["action"].as_str().unwrap_or_default().to_string();
                        log.lock().unwrap().push(value);

                        let steps = match action.as_str() {
                            "initialize" => &script.greeting,
                            "message" => &script.reply,
                            _ => continue,
                        };
                        for step in steps {
                            let sent = match step {
                                Step::Text(t) => sink.send(Message::Text(t.clone().into())).await,
                                Step::Binary(b) => sink.send(Message::Binary(b.clone().into())).await,
                                Step::Pause(d) => {
                                    tokio::time::sleep(*d).await;
                                    Ok(())
                                }
                                Step::Close => {
                                    let _ = sink.close().await;
                                    return;
                                }
                            };
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        Self { addr, received }
    }

    /// Every frame received so far, across all connections.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            host: format!("ws://{}", self.addr),
            worker_id: "worker-1".into(),
            flow_id: "flow-1".into(),
            api_key: "test-key".into(),
            ..EngineConfig::default()
        }
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Running bridge on an ephemeral port.
pub struct Bridge {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Bridge {
    pub async fn start(config: BridgeConfig, job_store: Option<Arc<dyn JobStore>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server = HttpServer::new(&config, job_store);
        let signal = shutdown.signal();

        tokio::spawn(async move {
            let _ = server.run(listener, signal).await;
        });

        Self { addr, shutdown }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Bridge config pointed at `engine`, with short completion timings.
pub fn bridge_config(engine: &MockEngine) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.engine = engine.engine_config();
    config.completion.grace_ms = 100;
    config.completion.prompt_ceiling_secs = 5;
    config.completion.greeting_ceiling_secs = 1;
    config.completion.quiet_window_ms = 300;
    config.completion.long_form_ceiling_secs = 10;
    config
}
