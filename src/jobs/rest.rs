//! PostgREST-compatible job store (Supabase and friends).
//!
//! # Wire Format
//! ```text
//! create: POST  {url}/rest/v1/{table}             Prefer: return=representation, body [row]
//! update: PATCH {url}/rest/v1/{table}?id=eq.{id}  body {columns}
//! read:   GET   {url}/rest/v1/{table}?id=eq.{id}&select=*
//! ```
//!
//! Optional columns (`response`, `error`) are only written after a read
//! confirms the table has them.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::JobStoreConfig;
use crate::jobs::store::JobStore;
use crate::jobs::types::{JobId, JobRecord, JobStoreError, JobStoreResult, JobUpdate, NewJob};

pub struct RestJobStore {
    client: reqwest::Client,
    endpoint: String,
}

impl RestJobStore {
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> JobStoreResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| JobStoreError::Decode("api key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| JobStoreError::Decode("api key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
        })
    }

    pub fn from_config(config: &JobStoreConfig) -> JobStoreResult<Self> {
        Self::new(
            &config.url,
            &config.api_key,
            &config.table,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn fetch_row(&self, id: &JobId) -> JobStoreResult<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .send()
            .await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        rows.into_iter().next().ok_or_else(|| JobStoreError::NotFound(id.clone()))
    }
}

async fn check(response: reqwest::Response) -> JobStoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(JobStoreError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl JobStore for RestJobStore {
    async fn create_job(&self, job: NewJob) -> JobStoreResult<JobId> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&[job])
            .send()
            .await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        let id = rows
            .first()
            .and_then(|row| row.get("id"))
            .cloned()
            .ok_or_else(|| JobStoreError::Decode("insert returned no id".into()))?;
        serde_json::from_value(id).map_err(|e| JobStoreError::Decode(e.to_string()))
    }

    async fn update_job(&self, id: &JobId, update: JobUpdate) -> JobStoreResult<()> {
        let row = self.fetch_row(id).await?;
        let columns: HashSet<String> = row
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();

        for optional in ["response", "error"] {
            if !columns.contains(optional) {
                tracing::debug!(job_id = %id, column = optional, "Job store lacks column, skipping");
            }
        }

        let response = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", format!("eq.{}", id))])
            .json(&update.to_patch(Some(&columns)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn read_job(&self, id: &JobId) -> JobStoreResult<JobRecord> {
        let row = self.fetch_row(id).await?;
        serde_json::from_value(row).map_err(|e| JobStoreError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout() {
        let store = RestJobStore::new("https://db.example/", "key", "jobs", Duration::from_secs(1)).unwrap();
        assert_eq!(store.endpoint, "https://db.example/rest/v1/jobs");
    }

    #[test]
    fn test_rejects_unprintable_key() {
        let err = RestJobStore::new("https://db.example", "bad\nkey", "jobs", Duration::from_secs(1));
        assert!(matches!(err, Err(JobStoreError::Decode(_))));
    }
}
