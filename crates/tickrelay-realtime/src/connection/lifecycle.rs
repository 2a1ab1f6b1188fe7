//! Lifecycle manager: drives connection state transitions and keeps the
//! registry in step with them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::handle::{CloseReason, Connection, ConnectionState};
use super::registry::ConnectionRegistry;
use crate::error::RelayError;
use crate::message::{OutboundFrame, ServerMessage};
use crate::metrics::{RelayMetrics, connections};

/// Owns every write to the connection registry.
#[derive(Debug)]
pub struct LifecycleManager {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<RelayMetrics>,
    buffer_size: usize,
    send_timeout: Duration,
}

impl LifecycleManager {
    /// Creates a lifecycle manager over `registry`.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<RelayMetrics>,
        buffer_size: usize,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            metrics,
            buffer_size,
            send_timeout,
        }
    }

    /// The registry this manager maintains.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Registers a freshly accepted transport and promotes it to `Open`.
    ///
    /// The welcome message is queued while the connection is still
    /// `Connecting`, so it precedes every broadcast. Returns the connection
    /// and the receiving end of its outbound queue for the socket writer.
    pub async fn open(
        &self,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<OutboundFrame>), RelayError> {
        let (connection, receiver) = Connection::new(self.buffer_size);
        let connection = Arc::new(connection);

        if let Err(err) = self.registry.add(connection.clone()) {
            connection.begin_close(CloseReason::Rejected(err.to_string()));
            connection.mark_closed();
            warn!(conn_id = %connection.id, error = %err, "Connection rejected");
            return Err(err);
        }

        let welcome = ServerMessage::welcome().to_frame();
        let queued = match welcome {
            Ok(frame) => self.send(&connection, frame).await,
            Err(err) => Err(err),
        };
        if let Err(err) = queued {
            self.fail(&connection, &err);
            drop(receiver);
            self.release(&connection);
            return Err(err);
        }

        if !connection.promote() {
            // Closed by shutdown between add and promote.
            drop(receiver);
            self.release(&connection);
            return Err(RelayError::RegistryClosed);
        }

        connections::record_open(&self.metrics);
        info!(
            conn_id = %connection.id,
            clients = self.registry.size(),
            "Subscriber connected"
        );

        Ok((connection, receiver))
    }

    /// Queues a frame to one connection, bounded by the send timeout.
    pub async fn send(&self, connection: &Connection, frame: OutboundFrame) -> Result<(), RelayError> {
        connection.deliver(frame, self.send_timeout).await
    }

    /// Moves `connection` to `Closing` and takes it out of the registry.
    ///
    /// The connection reaches `Closed` in [`LifecycleManager::release`] once
    /// its socket writer is gone; if the writer already dropped the queue,
    /// that happens here. Returns `false` if the connection was already
    /// closing or closed.
    pub fn close(&self, connection: &Connection, reason: CloseReason) -> bool {
        let Some(previous) = connection.begin_close(reason.clone()) else {
            self.registry.remove(&connection.id);
            return false;
        };

        self.registry.remove(&connection.id);

        if previous == ConnectionState::Open {
            connections::record_close(&self.metrics);
        }

        match &reason {
            CloseReason::DeliveryFailure(_) | CloseReason::TransportFault(_) => warn!(
                conn_id = %connection.id,
                reason = %reason,
                clients = self.registry.size(),
                "Connection closed after fault"
            ),
            _ => info!(
                conn_id = %connection.id,
                reason = %reason,
                clients = self.registry.size(),
                "Subscriber disconnected"
            ),
        }

        if connection.transport_released() {
            self.release(connection);
        }
        true
    }

    /// `Closing → Closed`, called once the socket has been let go.
    ///
    /// No-op unless the connection is `Closing`.
    pub fn release(&self, connection: &Connection) -> bool {
        if !connection.mark_closed() {
            return false;
        }
        self.registry.remove(&connection.id);
        debug!(conn_id = %connection.id, "Transport released");
        true
    }

    /// Closes a connection in response to a per-connection fault.
    pub fn fail(&self, connection: &Connection, err: &RelayError) -> bool {
        let reason = match err {
            RelayError::DeliveryFailure { reason, .. } => {
                CloseReason::DeliveryFailure(reason.clone())
            }
            RelayError::TransportFault { reason, .. } => CloseReason::TransportFault(reason.clone()),
            other => CloseReason::TransportFault(other.to_string()),
        };
        self.close(connection, reason)
    }

    /// Records liveness evidence from the peer.
    pub fn record_heartbeat(&self, connection: &Connection) {
        connection.record_seen();
        debug!(conn_id = %connection.id, "Heartbeat received");
    }

    /// Closes every registered connection. Returns how many were closed.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        self.registry
            .snapshot()
            .iter()
            .filter(|connection| self.close(connection, reason.clone()))
            .count()
    }
}
