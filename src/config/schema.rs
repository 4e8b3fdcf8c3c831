//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (even empty) file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::{delay_for, DEFAULT_CREDENTIAL_HEADER};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream generative API settings.
    pub upstream: UpstreamConfig,

    /// Retry configuration for relayed jobs.
    pub retries: RetryConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Offline asset cache settings.
    pub offline: OfflineConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream API the pass-through proxy forwards to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; the request path is appended to it.
    pub base_url: String,

    /// Header carrying the raw credential.
    pub credential_header: String,

    /// Timeout for a single proxied request, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            credential_header: DEFAULT_CREDENTIAL_HEADER.to_string(),
            timeout_secs: 300,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per job, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Per-attempt timeout in seconds. 0 disables it, which validation
    /// rejects because relayed jobs must fit in `timeouts.request_secs`.
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            attempt_timeout_secs: 300,
        }
    }
}

impl RetryConfig {
    /// Longest one job can run: every attempt timing out, plus every
    /// backoff sleep in between. `None` when attempts have no timeout.
    pub fn worst_case_job(&self) -> Option<Duration> {
        if self.attempt_timeout_secs == 0 {
            return None;
        }
        let attempts = self.max_attempts.max(1);
        let base = Duration::from_millis(self.base_delay_ms);
        // base + 2·base + ... + 2^(n-2)·base == 2^(n-1)·base - base
        let sleeps = delay_for(base, attempts - 1).saturating_sub(base);

        Some(
            Duration::from_secs(self.attempt_timeout_secs)
                .saturating_mul(attempts)
                .saturating_add(sleeps),
        )
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request, in seconds.
    ///
    /// Must cover `RetryConfig::worst_case_job` so `/relay/jobs` always
    /// answers with the job's own outcome.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 910 }
    }
}

/// Offline asset cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OfflineConfig {
    /// Enable the asset cache.
    pub enabled: bool,

    /// Version-stamped cache name. Bump it to replace the cache wholesale.
    pub cache_name: String,

    /// Paths installed into the cache at startup.
    pub manifest: Vec<String>,

    /// Origin assets are fetched from (install and cache misses).
    pub origin_url: Option<String>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cache_name: "genai-relay-v2".to_string(),
            manifest: vec!["/manifest.json".to_string()],
            origin_url: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log formatter.
    pub log_format: LogFormat,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
