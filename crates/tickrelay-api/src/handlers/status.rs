//! Server status.

use axum::Json;
use axum::extract::State;
use tracing::debug;

use tickrelay_core::types::now_iso8601;

use crate::dto::response::StatusResponse;
use crate::state::AppState;

/// Name reported by the status endpoint.
pub const SERVER_NAME: &str = "TickRelay WebSocket Server";

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let connected_clients = state.realtime.connected_clients();
    debug!(connected_clients, "Status requested");

    Json(StatusResponse {
        status: "ok".to_string(),
        server: SERVER_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now_iso8601(),
        connected_clients,
        uptime: state.uptime(),
        metrics: state.realtime.metrics(),
    })
}
