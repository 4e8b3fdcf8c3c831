//! Resilient request executor.
//!
//! # Data Flow
//! ```text
//! RequestJob
//!     → credential check (fail fast, no attempt)
//!     → transport.rs (one JSON POST per attempt, optional timeout)
//!     → classify.rs (2xx → parsed JSON, otherwise "API error: ...")
//!     → On failure: backoff.rs (sleep 1000, 2000, ... ms) and try again
//!     → Last attempt's result is returned as-is
//! ```
//!
//! Attempts of one job never overlap. Jobs share nothing but the
//! transport, so any number may run concurrently.

pub mod backoff;
pub mod classify;
pub mod error;
pub mod transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RetryConfig;
use crate::observability::metrics;

pub use backoff::{delay_for, Backoff};
pub use classify::{classify, error_detail, RawResponse};
pub use error::ExecutorError;
pub use transport::{HttpTransport, Transport, DEFAULT_CREDENTIAL_HEADER};

/// One logical request to the generative API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestJob {
    pub endpoint: String,
    pub payload: Value,
    pub credential: String,
}

impl RequestJob {
    pub fn new(endpoint: impl Into<String>, payload: Value, credential: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload,
            credential: credential.into(),
        }
    }
}

/// Attempt budget and pacing for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles on each further failure.
    pub base_delay: Duration,
    /// Upper bound on a single attempt. `None` waits forever.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            attempt_timeout: (config.attempt_timeout_secs > 0)
                .then(|| Duration::from_secs(config.attempt_timeout_secs)),
        }
    }
}

/// Executes jobs over a transport with retry and exponential backoff.
pub struct Executor<T> {
    transport: T,
    policy: ArcSwap<RetryPolicy>,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy: ArcSwap::from_pointee(policy),
        }
    }

    /// Policy new jobs will start with.
    pub fn policy(&self) -> Arc<RetryPolicy> {
        self.policy.load_full()
    }

    /// Replace the policy. Jobs already running keep the one they started with.
    pub fn set_policy(&self, policy: RetryPolicy) {
        tracing::info!(
            max_attempts = policy.max_attempts,
            base_delay_ms = policy.base_delay.as_millis() as u64,
            "Retry policy updated"
        );
        self.policy.store(Arc::new(policy));
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a job to completion.
    ///
    /// Returns the parsed response body of the first successful attempt, or
    /// the error of the last attempt once the budget is spent.
    pub async fn execute(&self, job: &RequestJob) -> Result<Value, ExecutorError> {
        if job.credential.is_empty() {
            metrics::record_job("missing_credential", None);
            return Err(ExecutorError::MissingCredential);
        }

        let body = serde_json::to_vec(&job.payload)
            .map(Bytes::from)
            .map_err(|e| ExecutorError::Payload(e.to_string()))?;

        let policy = self.policy.load_full();
        let endpoint = loggable_endpoint(&job.endpoint);
        let started = Instant::now();
        let mut backoff = Backoff::new(policy.base_delay);

        tracing::info!(endpoint = %endpoint, "Calling API");

        loop {
            let attempt = backoff.attempt() + 1;
            tracing::info!(endpoint = %endpoint, attempt, "Attempt starting");

            match self.attempt(job, body.clone(), policy.attempt_timeout).await {
                Ok(value) => {
                    metrics::record_attempt("success");
                    metrics::record_job("success", Some(started));
                    return Ok(value);
                }
                Err(err) => {
                    metrics::record_attempt(err.kind());

                    if attempt >= policy.max_attempts || !err.is_retryable() {
                        tracing::warn!(
                            endpoint = %endpoint,
                            attempt,
                            error = %err,
                            "Attempt failed, giving up"
                        );
                        metrics::record_job("failure", Some(started));
                        return Err(err);
                    }

                    let delay = backoff.advance();
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        job: &RequestJob,
        body: Bytes,
        attempt_timeout: Option<Duration>,
    ) -> Result<Value, ExecutorError> {
        let send = self.transport.post_json(&job.endpoint, &job.credential, body);

        let response = match attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                ExecutorError::Transport(format!("attempt timed out after {:?}", limit))
            })??,
            None => send.await?,
        };

        classify(response)
    }
}

/// Endpoint with its query string removed, for log lines only.
pub fn loggable_endpoint(endpoint: &str) -> &str {
    endpoint
        .split_once('?')
        .map_or(endpoint, |(base, _)| base)
}
