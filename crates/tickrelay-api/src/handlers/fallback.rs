//! Unmatched routes.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{StatusCode, Uri};
use tracing::debug;

use crate::dto::response::NotFoundResponse;

const ENDPOINTS: [(&str, &str); 6] = [
    ("GET /", "Health summary, or WebSocket upgrade"),
    ("GET /ws", "WebSocket upgrade"),
    ("GET /ws-info", "WebSocket connection URL"),
    ("GET /api/status", "Server status and metrics"),
    ("POST /api/ticker", "Submit ticker data"),
    ("WebSocket /", "Real-time data stream"),
];

/// Any route not matched above.
pub async fn not_found(uri: Uri) -> (StatusCode, Json<NotFoundResponse>) {
    debug!(path = %uri.path(), "No route matched");

    let available_endpoints: BTreeMap<String, String> = ENDPOINTS
        .iter()
        .map(|(route, description)| (route.to_string(), description.to_string()))
        .collect();

    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Endpoint not found".to_string(),
            available_endpoints,
        }),
    )
}
