//! Response classification.

use serde_json::Value;

use crate::executor::error::ExecutorError;

/// A response as seen by the executor, independent of the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Turn a response into the attempt's result.
pub fn classify(response: RawResponse) -> Result<Value, ExecutorError> {
    if response.is_success() {
        return serde_json::from_slice(&response.body)
            .map_err(|e| ExecutorError::InvalidBody(e.to_string()));
    }

    Err(ExecutorError::NonSuccessStatus {
        status: response.status,
        detail: error_detail(&response.body, &response.status_text),
    })
}

/// Best-effort failure detail for a non-success response.
///
/// Prefers `error.message`, then the whole JSON body, then the status text
/// when the body is not JSON at all.
pub fn error_detail(body: &[u8], status_text: &str) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(json) => json
            .pointer("/error/message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| json.to_string()),
        Err(_) => status_text.to_owned(),
    }
}
