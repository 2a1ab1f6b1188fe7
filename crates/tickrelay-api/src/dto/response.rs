//! Response DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tickrelay_realtime::{BroadcastReport, MetricsSnapshot};

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short description.
    pub error: String,
    /// Detail, when there is any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The accepted payload shape, on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// The rejected document, echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<Value>,
}

/// `POST /api/ticker` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerAccepted {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// Subscribers the update was queued to.
    pub clients_notified: usize,
    /// Per-connection outcome.
    pub delivery: BroadcastReport,
    /// Server time the update was stamped with.
    pub timestamp: String,
}

/// `GET /api/status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub server: String,
    pub version: String,
    pub timestamp: String,
    pub connected_clients: usize,
    /// Seconds since start.
    pub uptime: f64,
    pub metrics: MetricsSnapshot,
}

/// `GET /` body when no upgrade was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub websocket_clients: usize,
    /// Seconds since start.
    pub uptime: f64,
    pub timestamp: String,
}

/// `GET /ws-info` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsInfoResponse {
    pub websocket_url: String,
    pub note: String,
}

/// Unmatched route body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub error: String,
    /// Route → description.
    pub available_endpoints: BTreeMap<String, String>,
}
