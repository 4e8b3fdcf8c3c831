//! Request handlers.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::proxy::API_PATH_PREFIX;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::{JobOutcome, JobSubmission};

/// Liveness and usage hint.
pub async fn status() -> impl IntoResponse {
    metrics::record_request("status", 200);
    Json(json!({
        "message": "Proxy server running",
        "usage": "Use /v1beta/... paths for API calls",
    }))
}

/// Run a job through the relay and return its outcome.
///
/// Job failures are reported in the outcome body with a 200 status.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(submission): Json<JobSubmission>,
) -> Json<JobOutcome> {
    let id = submission.id.clone();
    tracing::info!(job_id = %id, "Job submitted over HTTP");

    let outcome = match state.relay.submit_with_id(submission).await {
        Ok(outcome) => outcome,
        Err(e) => JobOutcome::failure(id, e.to_string()),
    };

    metrics::record_request("jobs", 200);
    Json(outcome)
}

/// Everything below `/`: upstream API paths, offline assets, or 404.
pub async fn by_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if path.starts_with(API_PATH_PREFIX) {
        if method != Method::GET && method != Method::POST {
            metrics::record_request("proxy", 405);
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        return state
            .upstream
            .forward(method, &path, uri.query(), &headers, body)
            .await;
    }

    if method == Method::GET {
        if let Some(assets) = &state.assets {
            if let Some(asset) = assets.respond(uri.path()).await {
                metrics::record_request("asset", 200);
                let mut response = Response::new(Body::from(asset.body));
                if let Some(content_type) = asset
                    .content_type
                    .and_then(|ct| header::HeaderValue::from_str(&ct).ok())
                {
                    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
                }
                return response;
            }
        }
    }

    tracing::warn!(path = %path, "Ignoring request for invalid path");
    metrics::record_request("unknown", 404);
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "Not a valid API path"})),
    )
        .into_response()
}
