//! Ingest gateway.
//!
//! The one-shot path (HTTP submissions) and the persistent path (frames on a
//! WebSocket connection) both end here. A payload is decoded and validated
//! exactly once, stamped, and handed to the broadcast engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use tickrelay_core::types::ConnectionId;

use crate::broadcast::{BroadcastEngine, BroadcastReport};
use crate::connection::{Connection, LifecycleManager};
use crate::error::RelayError;
use crate::message::{ServerMessage, TickBatch, TickMessage};
use crate::metrics::{RelayMetrics, messages};

/// Result of an accepted update.
#[derive(Debug, Clone, Copy)]
pub struct IngestReceipt {
    /// How the broadcast went.
    pub report: BroadcastReport,
    /// The timestamp stamped onto the message.
    pub server_timestamp: DateTime<Utc>,
}

/// Entry point for producer updates.
#[derive(Debug)]
pub struct IngestGateway {
    broadcaster: Arc<BroadcastEngine>,
    lifecycle: Arc<LifecycleManager>,
    metrics: Arc<RelayMetrics>,
    max_message_bytes: usize,
}

impl IngestGateway {
    /// Creates a gateway that forwards to `broadcaster`.
    pub fn new(
        broadcaster: Arc<BroadcastEngine>,
        lifecycle: Arc<LifecycleManager>,
        metrics: Arc<RelayMetrics>,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            broadcaster,
            lifecycle,
            metrics,
            max_message_bytes,
        }
    }

    /// One-shot submission: broadcasts to every open connection.
    pub async fn submit(&self, body: &[u8]) -> Result<IngestReceipt, RelayError> {
        let batch = self.decode(body)?;
        self.forward(batch, None).await
    }

    /// A text frame received on a persistent connection.
    ///
    /// The update is broadcast to everyone except `source`. A rejected frame
    /// is answered with an error frame to `source` only; the connection is
    /// left open.
    pub async fn receive_frame(
        &self,
        source: &Connection,
        text: &str,
    ) -> Result<IngestReceipt, RelayError> {
        let result = if text.len() > self.max_message_bytes {
            Err(self.reject(RelayError::invalid_payload(
                format!("Frame exceeds {} bytes", self.max_message_bytes),
                Value::Null,
            )))
        } else {
            self.decode(text.as_bytes())
        };

        let batch = match result {
            Ok(batch) => batch,
            Err(err) => {
                self.notify_source(source, &err).await;
                return Err(err);
            }
        };
        self.forward(batch, Some(source.id)).await
    }

    fn decode(&self, raw: &[u8]) -> Result<TickBatch, RelayError> {
        TickBatch::decode(raw).map_err(|err| self.reject(err))
    }

    fn reject(&self, err: RelayError) -> RelayError {
        messages::record_rejected(&self.metrics);
        warn!(code = err.code(), error = %err, "Rejected producer update");
        err
    }

    async fn forward(
        &self,
        batch: TickBatch,
        source: Option<ConnectionId>,
    ) -> Result<IngestReceipt, RelayError> {
        if let Some(first) = batch.ticks().first() {
            let bid = first.get("bid").unwrap_or(&Value::Null);
            let ask = first.get("ask").unwrap_or(&Value::Null);
            debug!(
                ticks = batch.len(),
                symbol = batch.first_symbol().unwrap_or("?"),
                %bid,
                %ask,
                "Tick received"
            );
        }

        let message = TickMessage::stamp(batch, source);
        messages::record_ingested(&self.metrics);
        let report = self.broadcaster.broadcast(&message, source).await?;

        Ok(IngestReceipt {
            report,
            server_timestamp: message.server_timestamp(),
        })
    }

    async fn notify_source(&self, source: &Connection, err: &RelayError) {
        let frame = match ServerMessage::error(err).to_frame() {
            Ok(frame) => frame,
            Err(encode) => {
                warn!(conn_id = %source.id, error = %encode, "Failed to encode error frame");
                return;
            }
        };
        if let Err(send) = self.lifecycle.send(source, frame).await {
            self.lifecycle.fail(source, &send);
        }
    }
}
