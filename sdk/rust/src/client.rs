use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The bridge answered with a non-success status.
    #[error("bridge returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub session_id: String,
    /// Greeting sent by the engine when the session opened.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub status: String,
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub message: String,
    pub status: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
struct Reply {
    response: String,
}

pub struct BridgeClient {
    client: Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        decode(self.client.get(self.url("/health")).send().await?).await
    }

    /// Ask one question on a fresh connection.
    pub async fn chat(&self, message: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.url("/api/chat"))
            .json(&json!({ "message": message }))
            .send()
            .await?;
        Ok(decode::<Reply>(resp).await?.response)
    }

    pub async fn open_session(&self) -> Result<ChatSession, ClientError> {
        decode(self.client.post(self.url("/api/chat/session")).send().await?).await
    }

    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.url(&format!("/api/chat/{}/message", session_id)))
            .json(&json!({ "message": message }))
            .send()
            .await?;
        Ok(decode::<Reply>(resp).await?.response)
    }

    pub async fn close_session(&self, session_id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/chat/{}", session_id)))
            .send()
            .await?;
        decode::<Value>(resp).await.map(|_| ())
    }

    /// Start a background job; poll it with [`BridgeClient::job`].
    pub async fn start_job(&self, message: &str) -> Result<JobAccepted, ClientError> {
        let resp = self
            .client
            .post(self.url("/api/chat/polling"))
            .json(&json!({ "message": message }))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn job(&self, job_id: &str) -> Result<JobRecord, ClientError> {
        decode(self.client.get(self.url(&format!("/api/jobs/{}", job_id))).send().await?).await
    }

    /// Send an arbitrary JSON body, for callers that need the raw response.
    pub async fn post_raw(&self, path: &str, body: &Value) -> Result<Response, reqwest::Error> {
        self.client.post(self.url(path)).json(body).send().await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        return Err(ClientError::Api { status, message });
    }
    Ok(resp.json().await?)
}
