//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are collected
//! rather than stopping at the first one.

use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderName;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Err(e) = Url::parse(&config.upstream.base_url) {
        errors.push(ValidationError::new(
            "upstream.base_url",
            format!("invalid URL '{}': {}", config.upstream.base_url, e),
        ));
    }

    if HeaderName::from_bytes(config.upstream.credential_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "upstream.credential_header",
            format!("'{}' is not a valid header name", config.upstream.credential_header),
        ));
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }

    if config.retries.base_delay_ms == 0 {
        errors.push(ValidationError::new("retries.base_delay_ms", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else {
        match config.retries.worst_case_job() {
            Some(budget) if budget <= Duration::from_secs(config.timeouts.request_secs) => {}
            Some(budget) => errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!(
                    "{}s is shorter than a full retry sequence ({}s)",
                    config.timeouts.request_secs,
                    budget.as_secs_f64().ceil() as u64
                ),
            )),
            None => errors.push(ValidationError::new(
                "retries.attempt_timeout_secs",
                "must be greater than 0 while timeouts.request_secs bounds relayed jobs",
            )),
        }
    }

    if config.offline.enabled {
        if config.offline.cache_name.is_empty() {
            errors.push(ValidationError::new("offline.cache_name", "must not be empty"));
        }
        if let Some(origin) = &config.offline.origin_url {
            if let Err(e) = Url::parse(origin) {
                errors.push(ValidationError::new(
                    "offline.origin_url",
                    format!("invalid URL '{}': {}", origin, e),
                ));
            }
        }
        for path in &config.offline.manifest {
            if !path.starts_with('/') {
                errors.push(ValidationError::new(
                    "offline.manifest",
                    format!("'{}' must be an absolute path", path),
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
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
    fn test_defaults_are_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RelayConfig::default();
        config.retries.max_attempts = 0;
        config.retries.base_delay_ms = 0;
        config.upstream.base_url = "not a url".into();
        config.upstream.credential_header = "bad header".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "upstream.base_url",
                "upstream.credential_header",
                "retries.max_attempts",
                "retries.base_delay_ms",
            ]
        );
    }

    #[test]
    fn test_offline_checked_only_when_enabled() {
        let mut config = RelayConfig::default();
        config.offline.manifest = vec!["manifest.json".into()];
        assert!(validate_config(&config).is_ok());

        config.offline.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "offline.manifest");
    }

    #[test]
    fn test_request_timeout_covers_retry_sequence() {
        let mut config = RelayConfig::default();
        config.timeouts.request_secs = 330;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "timeouts.request_secs");
        assert!(errors[0].message.contains("903s"));

        config.timeouts.request_secs = 903;
        assert!(validate_config(&config).is_ok());

        config.retries.max_attempts = 4;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unbounded_attempts_rejected() {
        let mut config = RelayConfig::default();
        config.retries.attempt_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "retries.attempt_timeout_secs");
    }
}
