//! Broadcast engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use tickrelay_core::types::ConnectionId;

use crate::connection::{Connection, ConnectionRegistry, LifecycleManager};
use crate::error::RelayError;
use crate::message::{OutboundFrame, TickMessage};
use crate::metrics::{RelayMetrics, messages};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    /// Open connections a delivery was attempted to.
    pub attempted: usize,
    /// Deliveries that were queued.
    pub succeeded: usize,
    /// Deliveries that failed; those connections have been closed.
    pub failed: usize,
}

/// Delivers one message to every open connection in the registry.
///
/// Broadcasts are serialized so each connection sees messages in the order
/// they were submitted. Deliveries never wait for queue space: a subscriber
/// whose queue is full fails that delivery and is closed, so one slow
/// reader cannot hold up the dispatch lock.
#[derive(Debug)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
    lifecycle: Arc<LifecycleManager>,
    metrics: Arc<RelayMetrics>,
    dispatch: Mutex<()>,
}

impl BroadcastEngine {
    /// Creates a broadcast engine.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        lifecycle: Arc<LifecycleManager>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            metrics,
            dispatch: Mutex::new(()),
        }
    }

    /// Sends `message` to every open connection except `exclude`.
    ///
    /// Failed recipients are closed and removed before this returns; they
    /// are counted in the report but never turn into an error. Fails only
    /// when the registry has been closed for shutdown.
    pub async fn broadcast(
        &self,
        message: &TickMessage,
        exclude: Option<ConnectionId>,
    ) -> Result<BroadcastReport, RelayError> {
        let text: Arc<str> = message.to_wire()?.into();

        let _dispatch = self.dispatch.lock().await;
        if self.registry.is_closed() {
            return Err(RelayError::RegistryClosed);
        }

        let recipients: Vec<Arc<Connection>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|connection| connection.is_open() && Some(connection.id) != exclude)
            .collect();

        let mut report = BroadcastReport {
            attempted: recipients.len(),
            ..BroadcastReport::default()
        };
        for connection in &recipients {
            match connection.try_deliver(OutboundFrame::Text(text.clone())) {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(conn_id = %connection.id, error = %err, "Broadcast delivery failed");
                    self.lifecycle.fail(connection, &err);
                }
            }
        }

        messages::record_broadcast(&self.metrics, report.succeeded, report.failed);
        debug!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Broadcast complete"
        );
        Ok(report)
    }

    /// Waits until no broadcast is in flight.
    pub async fn quiesce(&self) {
        let _dispatch = self.dispatch.lock().await;
    }
}
