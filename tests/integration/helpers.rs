//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use tickrelay_api::{AppState, build_router, serve};
use tickrelay_core::config::AppConfig;
use tickrelay_core::error::AppError;

/// Client side of a test WebSocket.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Configuration used by every test: defaults, loopback bind.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.shutdown_grace_seconds = 5;
    config
}

/// In-process application driven through `tower::ServiceExt::oneshot`.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for inspecting the relay engine
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with the default test config
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a new test application with a custom config
    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::new(config);
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// Send a request with a raw body and return status + parsed JSON body
    pub async fn request(&self, method: &str, path: &str, body: Option<&str>) -> TestResponse {
        send(&self.router, method, path, body).await
    }
}

/// A live server bound to an ephemeral loopback port.
pub struct TestServer {
    /// Bound address
    pub addr: SocketAddr,
    /// Shared state of the running server
    pub state: AppState,
    router: Router,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl TestServer {
    /// Bind and start serving
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    /// Bind and start serving with a custom configuration
    pub async fn start_with(config: AppConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let state = AppState::new(config);
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state.clone(), async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            router: build_router(state.clone()),
            state,
            shutdown: Some(tx),
            handle,
        }
    }

    /// WebSocket URL for `path`
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Connect a subscriber and consume its welcome message
    pub async fn connect(&self) -> WsClient {
        let (mut client, _) = tokio_tungstenite::connect_async(self.ws_url("/"))
            .await
            .expect("WebSocket handshake failed");
        let welcome = next_json(&mut client).await.expect("no welcome message");
        assert_eq!(welcome["type"], "welcome");
        client
    }

    /// Submit a producer update through the same relay engine
    pub async fn post_ticker(&self, body: &str) -> TestResponse {
        send(&self.router, "POST", "/api/ticker", Some(body)).await
    }

    /// A router over the same relay engine, independent of the server's lifetime
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Poll until the registry holds `expected` connections
    pub async fn wait_for_clients(&self, expected: usize) {
        let engine = self.state.realtime.clone();
        tokio::time::timeout(WAIT, async move {
            while engine.connected_clients() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {expected} connections"));
    }

    /// Fire the shutdown signal and wait for `serve` to return
    pub async fn stop(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(15), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

/// Read the next JSON text frame, skipping control frames.
///
/// Returns `None` when the server closes the connection.
pub async fn next_json(client: &mut WsClient) -> Option<Value> {
    loop {
        let message = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for a frame")?;
        match message {
            Ok(Message::Text(text)) => {
                return Some(serde_json::from_str(text.as_str()).expect("frame is not JSON"));
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Test response wrapper
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Send a request through `router` and return status + parsed JSON body
pub async fn send(router: &Router, method: &str, path: &str, body: Option<&str>) -> TestResponse {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.unwrap_or_default().to_owned()))
        .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("Failed to read body");

    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    TestResponse { status, body }
}
