//! HTTP API end to end: bridge server, mock engine, SDK client.

use std::sync::Arc;
use std::time::Duration;
use axum::http::StatusCode;
use serde_json::json;
use sdk_rust::{BridgeClient, JobRecord};
use engine_bridge::config::BridgeConfig;
use engine_bridge::jobs::{JobStore, MemoryJobStore};

mod common;
use common::{bridge_config, done, message, pause, stream, Bridge, MockEngine, Script};

fn hello_script() -> Script {
    Script {
        greeting: vec![message("Welcome")],
        reply: vec![stream("He"), stream("llo"), done()],
    }
}

fn memory_store() -> Option<Arc<dyn JobStore>> {
    Some(Arc::new(MemoryJobStore::new()))
}

async fn wait_for_job(client: &BridgeClient, id: &str) -> JobRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let record = client.job(id).await.unwrap();
        if record.status != "processing" || tokio::time::Instant::now() >= deadline {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_health() {
    let engine = MockEngine::start(hello_script()).await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;

    let res = reqwest::get(format!("{}/health", bridge.url())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.json::<serde_json::Value>().await.unwrap(), json!({"status": "ok"}));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let engine = MockEngine::start(hello_script()).await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = BridgeClient::new(&bridge.url());

    let session = client.open_session().await.unwrap();
    assert_eq!(session.message, "Welcome");

    assert_eq!(client.send_message(&session.session_id, "hello").await.unwrap(), "Hello");
    assert_eq!(client.send_message(&session.session_id, "again").await.unwrap(), "Hello");

    client.close_session(&session.session_id).await.unwrap();

    let err = client.send_message(&session.session_id, "hello").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    let err = client.close_session(&session.session_id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_session_without_greeting_uses_default() {
    let engine = MockEngine::start(Script {
        greeting: vec![done()],
        reply: vec![message("ok")],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = BridgeClient::new(&bridge.url());

    let session = client.open_session().await.unwrap();
    assert_eq!(session.message, "Connected to chatbot");
    assert_eq!(client.send_message(&session.session_id, "hi").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_oversized_body_rejected_by_middleware() {
    let engine = MockEngine::start(hello_script()).await;
    let mut config = bridge_config(&engine);
    config.security.max_body_size = 256;
    let bridge = Bridge::start(config, None).await;
    let client = BridgeClient::new(&bridge.url());

    let res = client.post_raw("/api/chat", &json!({"message": "x".repeat(1024)})).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(res.headers().contains_key("x-request-id"));
    // nothing reached the engine
    assert!(engine.received().is_empty());
}

#[tokio::test]
async fn test_engine_without_greeting_does_not_stall_requests() {
    let engine = MockEngine::start(Script {
        greeting: vec![],
        reply: vec![message("ok")],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), memory_store()).await;
    let client = BridgeClient::new(&bridge.url());

    // greeting wait is bounded by the greeting ceiling, well under the prompt ceiling
    let started = tokio::time::Instant::now();
    assert_eq!(client.chat("hi").await.unwrap(), "ok");
    assert!(started.elapsed() < Duration::from_secs(4), "{:?}", started.elapsed());

    let started = tokio::time::Instant::now();
    let id = client.start_job("draft").await.unwrap().job_id.unwrap();
    let record = wait_for_job(&client, &id).await;
    assert_eq!(record.status, "complete");
    assert_eq!(record.response.as_deref(), Some("ok"));
    assert!(started.elapsed() < Duration::from_secs(4), "{:?}", started.elapsed());
}

#[tokio::test]
async fn test_message_is_required() {
    let engine = MockEngine::start(hello_script()).await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = BridgeClient::new(&bridge.url());
    let session = client.open_session().await.unwrap();

    let session_path = format!("/api/chat/{}/message", session.session_id);
    for path in ["/api/chat", "/api/chat/polling", session_path.as_str()] {
        let res = client.post_raw(path, &json!({"text": "wrong field"})).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Message is required");
    }
}

#[tokio::test]
async fn test_single_turn_chat() {
    let engine = MockEngine::start(hello_script()).await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = BridgeClient::new(&bridge.url());

    assert_eq!(client.chat("hello").await.unwrap(), "Hello");

    // greeting is not part of the reply, and the connection is released
    let received = engine.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1]["data"]["message"], "hello");
}

#[tokio::test]
async fn test_single_turn_empty_reply() {
    let engine = MockEngine::start(Script {
        greeting: vec![message("Welcome")],
        reply: vec![done()],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = BridgeClient::new(&bridge.url());

    assert_eq!(client.chat("hello").await.unwrap(), "No response received");
}

#[tokio::test]
async fn test_missing_engine_credentials() {
    let engine = MockEngine::start(hello_script()).await;
    let mut config = bridge_config(&engine);
    config.engine.api_key.clear();
    let bridge = Bridge::start(config, None).await;
    let client = BridgeClient::new(&bridge.url());

    let err = client.open_session().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.to_string().contains("BRAINBASE_API_KEY"));
}

#[tokio::test]
async fn test_unreachable_engine_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = BridgeConfig::default();
    config.engine.host = format!("ws://{}", addr);
    config.engine.worker_id = "w".into();
    config.engine.flow_id = "f".into();
    config.engine.api_key = "k".into();
    let bridge = Bridge::start(config, None).await;
    let client = BridgeClient::new(&bridge.url());

    let err = client.chat("hello").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
}

#[tokio::test]
async fn test_overlapping_session_messages_conflict() {
    let engine = MockEngine::start(Script {
        greeting: vec![message("Welcome")],
        reply: vec![pause(500), message("slow")],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = Arc::new(BridgeClient::new(&bridge.url()));
    let session = client.open_session().await.unwrap();

    let first = {
        let client = Arc::clone(&client);
        let id = session.session_id.clone();
        tokio::spawn(async move { client.send_message(&id, "one").await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    let err = client.send_message(&session.session_id, "two").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(first.await.unwrap().unwrap(), "slow");
}

#[tokio::test]
async fn test_long_form_job_completes_after_quiet_window() {
    let engine = MockEngine::start(Script {
        greeting: vec![message("Welcome")],
        reply: vec![
            stream("Chapter 3. "),
            pause(100),
            stream("It was "),
            pause(100),
            stream("a dark night."),
        ],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), memory_store()).await;
    let client = BridgeClient::new(&bridge.url());

    let accepted = client.start_job("draft chapter 3").await.unwrap();
    assert_eq!(accepted.status, "ok");
    let id = accepted.job_id.expect("job id");

    let record = wait_for_job(&client, &id).await;
    assert_eq!(record.status, "complete");
    assert_eq!(record.message, "draft chapter 3");
    assert_eq!(record.response.as_deref(), Some("Chapter 3. It was a dark night."));
    assert!(record.updated_at >= record.created_at);
}

#[tokio::test]
async fn test_job_error_on_silent_close() {
    let engine = MockEngine::start(Script {
        greeting: vec![message("Welcome")],
        reply: vec![common::Step::Close],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), memory_store()).await;
    let client = BridgeClient::new(&bridge.url());

    let id = client.start_job("draft").await.unwrap().job_id.unwrap();
    let record = wait_for_job(&client, &id).await;
    assert_eq!(record.status, "error");
    assert_eq!(record.error.as_deref(), Some("connection closed before reply"));
}

#[tokio::test]
async fn test_job_error_from_remote() {
    let engine = MockEngine::start(Script {
        greeting: vec![message("Welcome")],
        reply: vec![common::error("quota exceeded"), done()],
    })
    .await;
    let bridge = Bridge::start(bridge_config(&engine), memory_store()).await;
    let client = BridgeClient::new(&bridge.url());

    let id = client.start_job("draft").await.unwrap().job_id.unwrap();
    let record = wait_for_job(&client, &id).await;
    assert_eq!(record.status, "error");
    assert_eq!(record.error.as_deref(), Some("quota exceeded"));
}

#[tokio::test]
async fn test_jobs_without_store() {
    let engine = MockEngine::start(hello_script()).await;
    let bridge = Bridge::start(bridge_config(&engine), None).await;
    let client = BridgeClient::new(&bridge.url());

    let accepted = client.start_job("draft").await.unwrap();
    assert_eq!(accepted.status, "ok");
    assert_eq!(accepted.job_id, None);

    let err = client.job("1").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

    // the job still runs to completion
    assert!(common::eventually(Duration::from_secs(5), || engine.received().len() >= 2).await);
}

#[tokio::test]
async fn test_unknown_job() {
    let engine = MockEngine::start(hello_script()).await;
    let bridge = Bridge::start(bridge_config(&engine), memory_store()).await;
    let client = BridgeClient::new(&bridge.url());

    let err = client.job("404").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}
