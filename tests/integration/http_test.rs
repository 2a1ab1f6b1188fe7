//! Integration tests for the HTTP endpoints.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use helpers::{TestApp, test_config};

const EURUSD: &str = r#"{"data":[{"symbol":"EURUSD","bid":1.0842,"ask":1.0844}]}"#;

#[tokio::test]
async fn test_ticker_accepts_valid_batch() {
    let app = TestApp::new();

    let response = app.request("POST", "/api/ticker", Some(EURUSD)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["message"], "Data received and broadcasted");
    assert_eq!(response.body["clients_notified"], 0);
    assert_eq!(response.body["delivery"]["attempted"], 0);
    assert!(response.body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_ticker_rejects_missing_data() {
    let app = TestApp::new();

    let response = app.request("POST", "/api/ticker", Some("{}")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid data format");
    assert_eq!(response.body["expected"], "JSON with 'data' array property");
    assert_eq!(response.body["received"], json!({}));
    assert_eq!(app.state.realtime.metrics().broadcasts, 0);
}

#[tokio::test]
async fn test_ticker_rejects_non_array_data() {
    let app = TestApp::new();

    let response = app
        .request("POST", "/api/ticker", Some(r#"{"data":"EURUSD"}"#))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["received"], json!({"data": "EURUSD"}));
}

#[tokio::test]
async fn test_ticker_rejects_empty_body() {
    let app = TestApp::new();

    let response = app.request("POST", "/api/ticker", None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Empty request body");
}

#[tokio::test]
async fn test_ticker_rejects_malformed_json() {
    let app = TestApp::new();

    let response = app
        .request("POST", "/api/ticker", Some(r#"{"data": [{"symbol": "#))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Malformed JSON");
    assert_eq!(app.state.realtime.metrics().messages_rejected, 1);
}

#[tokio::test]
async fn test_ticker_ignores_content_type() {
    let app = TestApp::new();

    let req = Request::builder()
        .method("POST")
        .uri("/api/ticker")
        .header("Content-Type", "text/plain")
        .body(Body::from(EURUSD))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ticker_enforces_body_limit() {
    let mut config = test_config();
    config.server.max_body_bytes = 64;
    let app = TestApp::with_config(config);

    let body = format!(r#"{{"data":[{{"symbol":"{}"}}]}}"#, "X".repeat(128));
    let response = app.request("POST", "/api/ticker", Some(&body)).await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["error"], "Payload too large");
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn test_status_reports_clients_and_metrics() {
    let app = TestApp::new();
    app.request("POST", "/api/ticker", Some(EURUSD)).await;

    let response = app.request("GET", "/api/status", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["connected_clients"], 0);
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
    assert!(response.body["uptime"].as_f64().is_some());
    assert_eq!(response.body["metrics"]["messages_ingested"], 1);
    assert_eq!(response.body["metrics"]["broadcasts"], 1);
}

#[tokio::test]
async fn test_root_without_upgrade_is_health() {
    let app = TestApp::new();

    let response = app.request("GET", "/", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["websocket_clients"], 0);
}

#[tokio::test]
async fn test_ws_info_uses_host_header() {
    let app = TestApp::new();

    let req = Request::builder()
        .uri("/ws-info")
        .header("Host", "ticks.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["websocket_url"], "wss://ticks.example.com");
}

#[tokio::test]
async fn test_unknown_route_lists_endpoints() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/nope", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Endpoint not found");
    assert!(response.body["available_endpoints"]["POST /api/ticker"].is_string());
}
