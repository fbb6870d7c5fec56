//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{BridgeConfig, JobStoreBackend};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => BridgeConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a parsed configuration.
///
/// Empty values are ignored. Setting both `SUPABASE_URL` and `SUPABASE_KEY`
/// switches the job store to the REST backend.
pub fn apply_env_overrides<F>(config: &mut BridgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        config.listener.bind_address = format!("0.0.0.0:{}", port.trim());
    }
    if let Some(host) = var("ENGINE_HOST") {
        config.engine.host = host;
    }
    if let Some(worker_id) = var("WORKER_ID") {
        config.engine.worker_id = worker_id;
    }
    if let Some(flow_id) = var("FLOW_ID") {
        config.engine.flow_id = flow_id;
    }
    if let Some(api_key) = var("BRAINBASE_API_KEY") {
        config.engine.api_key = api_key;
    }
    if let Some(deployment) = var("DEPLOYMENT_TYPE") {
        config.engine.deployment_type = deployment;
    }
    if let Some(table) = var("JOB_STORE_TABLE") {
        config.job_store.table = table;
    }

    if let (Some(url), Some(key)) = (var("SUPABASE_URL"), var("SUPABASE_KEY")) {
        config.job_store.backend = JobStoreBackend::Rest;
        config.job_store.url = url;
        config.job_store.api_key = key;
    }
}
