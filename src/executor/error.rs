//! Executor failure taxonomy.

use thiserror::Error;

/// Failure of a job, or of a single attempt within it.
///
/// There is no "gave up" variant: once the attempt budget is spent the
/// final attempt's error is returned unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// No credential was supplied. Raised before any attempt.
    #[error("API credential is not configured")]
    MissingCredential,

    /// The payload could not be serialized. Raised before any attempt.
    #[error("payload serialization failed: {0}")]
    Payload(String),

    /// Network-level failure, including a per-attempt timeout.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response arrived with a status outside the 2xx range.
    #[error("API error: {status} - {detail}")]
    NonSuccessStatus { status: u16, detail: String },

    /// A 2xx response whose body was not valid JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl ExecutorError {
    /// Whether another attempt may be made after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutorError::Transport(_)
                | ExecutorError::NonSuccessStatus { .. }
                | ExecutorError::InvalidBody(_)
        )
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorError::MissingCredential => "missing_credential",
            ExecutorError::Payload(_) => "payload",
            ExecutorError::Transport(_) => "transport",
            ExecutorError::NonSuccessStatus { .. } => "status",
            ExecutorError::InvalidBody(_) => "invalid_body",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_format() {
        let err = ExecutorError::NonSuccessStatus {
            status: 500,
            detail: "quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 - quota exceeded");
    }

    #[test]
    fn test_fatal_errors_not_retryable() {
        assert!(!ExecutorError::MissingCredential.is_retryable());
        assert!(!ExecutorError::Payload("x".into()).is_retryable());
        assert!(ExecutorError::Transport("refused".into()).is_retryable());
    }
}
