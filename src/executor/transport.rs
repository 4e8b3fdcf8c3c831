//! Outbound HTTP transport.

use std::future::Future;

use bytes::Bytes;
use reqwest::header::{HeaderName, InvalidHeaderName, CONTENT_TYPE};

use crate::executor::classify::RawResponse;
use crate::executor::error::ExecutorError;

/// Default header carrying the raw credential.
pub const DEFAULT_CREDENTIAL_HEADER: &str = "x-goog-api-key";

/// Sends one JSON POST and hands back the raw response.
///
/// Only network-level failures are errors here; any HTTP status is a
/// successful transport round trip and is classified by the executor.
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        endpoint: &str,
        credential: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<RawResponse, ExecutorError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    credential_header: HeaderName,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, credential_header: HeaderName) -> Self {
        Self {
            client,
            credential_header,
        }
    }

    /// Transport with a default client and the named credential header.
    pub fn with_header_name(credential_header: &str) -> Result<Self, InvalidHeaderName> {
        let header = HeaderName::from_bytes(credential_header.as_bytes())?;
        Ok(Self::new(reqwest::Client::new(), header))
    }

    pub fn credential_header(&self) -> &HeaderName {
        &self.credential_header
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(
            reqwest::Client::new(),
            HeaderName::from_static(DEFAULT_CREDENTIAL_HEADER),
        )
    }
}

impl Transport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        credential: &str,
        body: Bytes,
    ) -> Result<RawResponse, ExecutorError> {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(self.credential_header.clone(), credential)
            .body(body)
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}
