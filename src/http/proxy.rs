//! Pass-through proxy for upstream API paths.
//!
//! Forwards method, query and body to the upstream as-is and hands the
//! upstream status and body back verbatim. No retries here; retries belong
//! to relayed jobs.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::ServerError;
use crate::observability::metrics;

/// Prefix of paths forwarded to the upstream.
pub const API_PATH_PREFIX: &str = "v1beta/";

pub struct Upstream {
    client: reqwest::Client,
    base_url: Url,
    credential_header: HeaderName,
    timeout: Duration,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ServerError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ServerError::Config(format!("upstream.base_url: {}", e)))?;
        let credential_header = HeaderName::from_bytes(config.credential_header.as_bytes())
            .map_err(|e| ServerError::Config(format!("upstream.credential_header: {}", e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            credential_header,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn credential_header(&self) -> &HeaderName {
        &self.credential_header
    }

    /// Upstream URL for a request path (no leading slash) and query.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Option<Url> {
        let mut url = self.base_url.join(path).ok()?;
        url.set_query(query);
        Some(url)
    }

    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response {
        let Some(credential) = headers
            .get(&self.credential_header)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        else {
            metrics::record_request("proxy", 400);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "API key required"})),
            )
                .into_response();
        };

        let Some(url) = self.target_url(path, query) else {
            metrics::record_request("proxy", 400);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Not a valid API path"})),
            )
                .into_response();
        };

        tracing::info!(path = %path, "Proxying request");

        let result = self
            .client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(self.credential_header.clone(), credential)
            .body(body)
            .timeout(self.timeout)
            .send()
            .await;

        let upstream = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Connection error while contacting upstream");
                metrics::record_request("proxy", 502);
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": "Upstream connection failed",
                        "details": e.to_string(),
                    })),
                )
                    .into_response();
            }
        };

        let status = upstream.status();
        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
        tracing::info!(status = %status, "Upstream responded");

        let body = match upstream.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read upstream body");
                metrics::record_request("proxy", 502);
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": "Upstream connection failed",
                        "details": e.to_string(),
                    })),
                )
                    .into_response();
            }
        };

        metrics::record_request("proxy", status.as_u16());

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        if let Some(content_type) = content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}
