//! REST job store against a mock PostgREST endpoint.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use engine_bridge::jobs::{JobId, JobStatus, JobStore, JobStoreError, JobUpdate, NewJob, RestJobStore};

#[derive(Default)]
struct Table {
    rows: Vec<Value>,
    patches: Vec<Value>,
    auth: Vec<(String, String)>,
}

type Shared = Arc<Mutex<Table>>;

fn row_index(table: &Table, query: &HashMap<String, String>) -> Option<usize> {
    let id = query.get("id")?.strip_prefix("eq.")?;
    table.rows.iter().position(|row| row["id"].to_string() == id)
}

fn record_auth(table: &mut Table, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    table.auth.push((header("apikey"), header("authorization")));
}

async fn insert(State(db): State<Shared>, headers: HeaderMap, Json(body): Json<Vec<Value>>) -> (StatusCode, Json<Value>) {
    let mut table = db.lock().unwrap();
    record_auth(&mut table, &headers);
    if headers.get("prefer").and_then(|v| v.to_str().ok()) != Some("return=representation") {
        return (StatusCode::CREATED, Json(json!([])));
    }

    let mut created = Vec::new();
    for mut row in body {
        // this table has a response column but no error column
        row["id"] = json!(table.rows.len() + 1);
        row["response"] = Value::Null;
        table.rows.push(row.clone());
        created.push(row);
    }
    (StatusCode::CREATED, Json(Value::Array(created)))
}

async fn select(
    State(db): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut table = db.lock().unwrap();
    record_auth(&mut table, &headers);
    match row_index(&table, &query) {
        Some(i) => Json(json!([table.rows[i].clone()])),
        None => Json(json!([])),
    }
}

async fn patch(
    State(db): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut table = db.lock().unwrap();
    table.patches.push(body.clone());
    let Some(i) = row_index(&table, &query) else {
        return StatusCode::NO_CONTENT;
    };
    if let (Some(row), Some(fields)) = (table.rows[i].as_object_mut(), body.as_object()) {
        for (k, v) in fields {
            row.insert(k.clone(), v.clone());
        }
    }
    StatusCode::NO_CONTENT
}

async fn start_postgrest() -> (SocketAddr, Shared) {
    let db: Shared = Arc::default();
    let app = Router::new()
        .route("/rest/v1/jobs", get(select).post(insert).patch(patch))
        .with_state(Arc::clone(&db));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, db)
}

fn store_for(addr: SocketAddr) -> RestJobStore {
    RestJobStore::new(&format!("http://{}", addr), "service-key", "jobs", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_create_returns_store_id() {
    let (addr, db) = start_postgrest().await;
    let store = store_for(addr);

    let id = store.create_job(NewJob::processing("draft chapter 3", Utc::now())).await.unwrap();
    assert_eq!(id, JobId::from("1"));

    let table = db.lock().unwrap();
    assert_eq!(table.rows[0]["status"], "processing");
    assert_eq!(table.rows[0]["message"], "draft chapter 3");
    assert_eq!(table.auth[0], ("service-key".to_string(), "Bearer service-key".to_string()));
}

#[tokio::test]
async fn test_update_skips_missing_columns() {
    let (addr, db) = start_postgrest().await;
    let store = store_for(addr);
    let id = store.create_job(NewJob::processing("draft", Utc::now())).await.unwrap();

    store
        .update_job(
            &id,
            JobUpdate {
                status: JobStatus::Error,
                response: Some("partial".into()),
                error: Some("connection closed before reply".into()),
                updated_at: "2024-01-01T00:00:00.000Z".into(),
            },
        )
        .await
        .unwrap();

    let patch = db.lock().unwrap().patches[0].clone();
    assert_eq!(
        patch,
        json!({
            "status": "error",
            "response": "partial",
            "updated_at": "2024-01-01T00:00:00.000Z",
        })
    );

    let record = store.read_job(&id).await.unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert_eq!(record.response.as_deref(), Some("partial"));
    assert_eq!(record.error, None);
}

#[tokio::test]
async fn test_read_unknown_job() {
    let (addr, _db) = start_postgrest().await;
    let store = store_for(addr);
    let err = store.read_job(&JobId::from("77")).await.unwrap_err();
    assert!(matches!(err, JobStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_unreachable_store_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = store_for(addr);
    let err = store.create_job(NewJob::processing("x", Utc::now())).await.unwrap_err();
    assert!(matches!(err, JobStoreError::Http(_)));
}
