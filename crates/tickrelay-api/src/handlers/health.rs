//! Health and connection-info handlers.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::HOST;

use tickrelay_core::types::now_iso8601;

use crate::dto::response::{HealthResponse, WsInfoResponse};
use crate::state::AppState;

/// GET / (without an upgrade request)
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        websocket_clients: state.realtime.connected_clients(),
        uptime: state.uptime(),
        timestamp: now_iso8601(),
    })
}

/// GET /ws-info
pub async fn ws_info(headers: HeaderMap) -> Json<WsInfoResponse> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    Json(WsInfoResponse {
        websocket_url: format!("wss://{host}"),
        note: "Connect to this URL using WebSocket protocol".to_string(),
    })
}
