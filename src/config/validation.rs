//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that completion timings are ordered sensibly
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Missing engine credentials are reported per request, not at startup

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{BridgeConfig, JobStoreBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("engine host '{0}' must use ws:// or wss://")]
    EngineScheme(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{smaller} must be shorter than {larger}")]
    Ordering {
        smaller: &'static str,
        larger: &'static str,
    },

    #[error("rest job store requires {0}")]
    JobStore(&'static str),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let host = config.engine.host.as_str();
    if !(host.starts_with("ws://") || host.starts_with("wss://")) {
        errors.push(ValidationError::EngineScheme(config.engine.host.clone()));
    }

    let completion = &config.completion;
    for (field, value) in [
        ("engine.connect_timeout_secs", config.engine.connect_timeout_secs),
        ("completion.prompt_ceiling_secs", completion.prompt_ceiling_secs),
        ("completion.greeting_ceiling_secs", completion.greeting_ceiling_secs),
        ("completion.quiet_window_ms", completion.quiet_window_ms),
        ("completion.long_form_ceiling_secs", completion.long_form_ceiling_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("security.max_body_size", config.security.max_body_size as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if completion.grace_ms >= completion.prompt_ceiling_secs.saturating_mul(1000) {
        errors.push(ValidationError::Ordering {
            smaller: "completion.grace_ms",
            larger: "completion.prompt_ceiling_secs",
        });
    }
    if completion.grace_ms >= completion.greeting_ceiling_secs.saturating_mul(1000) {
        errors.push(ValidationError::Ordering {
            smaller: "completion.grace_ms",
            larger: "completion.greeting_ceiling_secs",
        });
    }
    if completion.quiet_window_ms >= completion.long_form_ceiling_secs.saturating_mul(1000) {
        errors.push(ValidationError::Ordering {
            smaller: "completion.quiet_window_ms",
            larger: "completion.long_form_ceiling_secs",
        });
    }
    if completion.prompt_ceiling_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::Ordering {
            smaller: "completion.prompt_ceiling_secs",
            larger: "timeouts.request_secs",
        });
    }

    if config.job_store.backend == JobStoreBackend::Rest {
        if config.job_store.url.is_empty() {
            errors.push(ValidationError::JobStore("job_store.url"));
        }
        if config.job_store.api_key.is_empty() {
            errors.push(ValidationError::JobStore("job_store.api_key"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&BridgeConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = BridgeConfig::default();
        config.listener.bind_address = "nope".into();
        config.engine.host = "https://engine.example".into();
        config.completion.quiet_window_ms = 0;
        config.job_store.backend = JobStoreBackend::Rest;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BindAddress("nope".into())));
        assert!(errors.contains(&ValidationError::EngineScheme("https://engine.example".into())));
        assert!(errors.contains(&ValidationError::Zero { field: "completion.quiet_window_ms" }));
        assert!(errors.contains(&ValidationError::JobStore("job_store.url")));
        assert!(errors.contains(&ValidationError::JobStore("job_store.api_key")));
    }

    #[test]
    fn test_quiet_window_must_fit_under_ceiling() {
        let mut config = BridgeConfig::default();
        config.completion.quiet_window_ms = 400_000;
        config.completion.long_form_ceiling_secs = 300;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("quiet_window_ms"));
    }

    #[test]
    fn test_grace_must_fit_under_greeting_ceiling() {
        let mut config = BridgeConfig::default();
        config.completion.greeting_ceiling_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::Zero { field: "completion.greeting_ceiling_secs" }));
        assert!(errors.contains(&ValidationError::Ordering {
            smaller: "completion.grace_ms",
            larger: "completion.greeting_ceiling_secs",
        }));
    }
}
