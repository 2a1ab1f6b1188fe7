//! Producer submissions.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use bytes::Bytes;
use tracing::info;

use tickrelay_core::types::iso8601;

use crate::dto::response::TickerAccepted;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/ticker
///
/// The body is read raw and validated by the ingest gateway, so a missing
/// or wrong `Content-Type` is not an error. Bodies over the configured limit
/// get a JSON 413.
pub async fn submit_ticker(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<TickerAccepted>, ApiError> {
    let body = body?;
    let receipt = state.realtime.submit(&body).await?;

    info!(
        bytes = body.len(),
        clients_notified = receipt.report.succeeded,
        failed = receipt.report.failed,
        "Ticker data broadcast"
    );

    Ok(Json(TickerAccepted {
        status: "success".to_string(),
        message: "Data received and broadcasted".to_string(),
        clients_notified: receipt.report.succeeded,
        delivery: receipt.report,
        timestamp: iso8601(&receipt.server_timestamp),
    }))
}
