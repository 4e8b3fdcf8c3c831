//! Messages crossing the relay boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::executor::{ExecutorError, RequestJob};

/// Caller-chosen job identifier, echoed back on the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A job handed to the relay worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub id: JobId,
    pub endpoint: String,
    pub payload: Value,
    /// Absent means empty, which the executor rejects.
    #[serde(default)]
    pub credential: String,
}

impl JobSubmission {
    pub fn new(
        id: JobId,
        endpoint: impl Into<String>,
        payload: Value,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            payload,
            credential: credential.into(),
        }
    }

    pub fn into_parts(self) -> (JobId, RequestJob) {
        let job = RequestJob {
            endpoint: self.endpoint,
            payload: self.payload,
            credential: self.credential,
        };
        (self.id, job)
    }
}

/// The single result of a job, delivered back to the submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub id: JobId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn success(id: JobId, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: JobId, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn from_result(id: JobId, result: Result<Value, ExecutorError>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(e) => Self::failure(id, e.to_string()),
        }
    }

    /// Back to a plain result; the error side is the failure message.
    pub fn into_result(self) -> Result<Value, String> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}
