//! End-to-end tests of the HTTP front.

use std::net::SocketAddr;

use genai_relay::config::RelayConfig;
use genai_relay::http::HttpServer;
use genai_relay::lifecycle::Shutdown;
use genai_relay::relay::JobOutcome;
use serde_json::{json, Value};
use tokio::sync::mpsc;

mod common;

async fn start_server(mut config: RelayConfig) -> (SocketAddr, Shutdown) {
    config.retries.base_delay_ms = 10;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.clone()).unwrap();
    let (_updates_tx, updates_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx).await;
    });

    // Offline precache runs before serving; wait until the socket answers.
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client.get(format!("http://{}/", addr)).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    (addr, shutdown)
}

#[tokio::test]
async fn test_status_endpoint() {
    let (addr, shutdown) = start_server(RelayConfig::default()).await;

    let res = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Proxy server running");

    shutdown.trigger();
}

#[tokio::test]
async fn test_relay_job_round_trip() {
    let (backend, _log) =
        common::start_programmable_backend(|_| async { (200, r#"{"candidates":[1]}"#.to_string()) })
            .await;
    let (addr, shutdown) = start_server(RelayConfig::default()).await;

    let outcome: JobOutcome = reqwest::Client::new()
        .post(format!("http://{}/relay/jobs", addr))
        .json(&json!({
            "id": "job-42",
            "endpoint": format!("http://{}/v1beta/models/m:generateContent", backend),
            "payload": {"contents": []},
            "credential": "key",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(outcome.id.as_str(), "job-42");
    assert!(outcome.success);
    assert_eq!(outcome.result, Some(json!({"candidates": [1]})));

    shutdown.trigger();
}

#[tokio::test]
async fn test_relay_job_failure_reported_in_body() {
    let (backend, log) = common::start_programmable_backend(|_| async {
        (500, r#"{"error":{"message":"quota exceeded"}}"#.to_string())
    })
    .await;
    let (addr, shutdown) = start_server(RelayConfig::default()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{}/relay/jobs", addr))
        .json(&json!({
            "id": "job-1",
            "endpoint": format!("http://{}/v1beta/x", backend),
            "payload": {},
            "credential": "key",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let outcome: JobOutcome = res.json().await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("API error: 500 - quota exceeded"));
    assert_eq!(log.lock().unwrap().len(), 3);

    let outcome: JobOutcome = client
        .post(format!("http://{}/relay/jobs", addr))
        .json(&json!({
            "id": "job-2",
            "endpoint": format!("http://{}/v1beta/x", backend),
            "payload": {},
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("credential"));
    assert_eq!(log.lock().unwrap().len(), 3, "no call without a credential");

    shutdown.trigger();
}

#[tokio::test]
async fn test_proxy_requires_key() {
    let (addr, shutdown) = start_server(RelayConfig::default()).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/v1beta/models/m:generateContent", addr))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "API key required"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_proxy_forwards_verbatim() {
    let (backend, log) = common::start_programmable_backend(|_| async {
        (429, r#"{"error":{"message":"rate limited"}}"#.to_string())
    })
    .await;

    let mut config = RelayConfig::default();
    config.upstream.base_url = format!("http://{}/", backend);
    let (addr, shutdown) = start_server(config).await;

    let res = reqwest::Client::new()
        .post(format!(
            "http://{}/v1beta/models/m:generateContent?alt=json",
            addr
        ))
        .header("x-goog-api-key", "k-1")
        .body(r#"{"contents":[]}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 429, "no retry, status passed through");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["message"], "rate limited");

    let requests = log.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, "/v1beta/models/m:generateContent?alt=json");
    assert_eq!(requests[0].headers["x-goog-api-key"], "k-1");
    assert_eq!(requests[0].body, r#"{"contents":[]}"#);

    shutdown.trigger();
}

#[tokio::test]
async fn test_proxy_upstream_down_is_bad_gateway() {
    let mut config = RelayConfig::default();
    config.upstream.base_url = format!("http://{}/", common::closed_port().await);
    let (addr, shutdown) = start_server(config).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/v1beta/models", addr))
        .header("x-goog-api-key", "k")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_path_not_found() {
    let (addr, shutdown) = start_server(RelayConfig::default()).await;

    let res = reqwest::get(format!("http://{}/admin/secrets", addr)).await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Not a valid API path"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_offline_assets_precached() {
    let (origin, log) = common::start_programmable_backend(|request| async move {
        match request.target.as_str() {
            "/manifest.json" => (200, r#"{"name":"fic-writer"}"#.to_string()),
            "/late.js" => (200, r#""late""#.to_string()),
            _ => (404, "{}".to_string()),
        }
    })
    .await;

    let mut config = RelayConfig::default();
    config.offline.enabled = true;
    config.offline.origin_url = Some(format!("http://{}/", origin));
    let (addr, shutdown) = start_server(config).await;

    for _ in 0..2 {
        let res = reqwest::get(format!("http://{}/manifest.json", addr)).await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), r#"{"name":"fic-writer"}"#);
    }
    let manifest_fetches = log
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.target == "/manifest.json")
        .count();
    assert_eq!(manifest_fetches, 1, "served from cache after install");

    let res = reqwest::get(format!("http://{}/late.js", addr)).await.unwrap();
    assert_eq!(res.status(), 200, "cache miss falls through to origin");

    let res = reqwest::get(format!("http://{}/missing.js", addr)).await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_offline_fallthrough_stays_on_origin() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (origin, origin_log) = common::start_programmable_backend(|request| async move {
        match request.target.as_str() {
            "/manifest.json" => (200, "{}".to_string()),
            _ => (404, "{}".to_string()),
        }
    })
    .await;
    let (other, other_log) = common::start_programmable_backend(|_| async move {
        (200, r#"{"secret":"internal"}"#.to_string())
    })
    .await;

    let mut config = RelayConfig::default();
    config.offline.enabled = true;
    config.offline.origin_url = Some(format!("http://{}/", origin));
    let (addr, shutdown) = start_server(config).await;

    // reqwest would normalise the path, so write the request line by hand.
    let mut socket = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET //{}/internal HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        other, addr
    );
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    socket.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    assert!(!response.contains("secret"));
    assert!(other_log.lock().unwrap().is_empty());
    assert!(origin_log
        .lock()
        .unwrap()
        .iter()
        .any(|r| r.target == format!("/{}/internal", other)));

    shutdown.trigger();
}
