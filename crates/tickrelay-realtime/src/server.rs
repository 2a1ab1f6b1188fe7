//! Top-level relay engine that ties together all subsystems.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::task::task_tracker::TrackedFuture;
use tracing::{debug, info};

use tickrelay_core::config::RealtimeConfig;

use crate::broadcast::BroadcastEngine;
use crate::connection::{
    CloseReason, Connection, ConnectionRegistry, HeartbeatConfig, LifecycleManager, run_heartbeat,
};
use crate::error::RelayError;
use crate::ingest::{IngestGateway, IngestReceipt};
use crate::message::{InboundFrame, OutboundFrame};
use crate::metrics::{MetricsSnapshot, RelayMetrics, connections};
use crate::shutdown::{ShutdownCoordinator, ShutdownReport};

/// Central relay engine shared by every HTTP handler and socket task.
pub struct RealtimeEngine {
    /// Registered connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Connection state transitions.
    pub lifecycle: Arc<LifecycleManager>,
    /// Fan-out.
    pub broadcaster: Arc<BroadcastEngine>,
    /// Producer intake.
    pub gateway: Arc<IngestGateway>,
    /// Graceful shutdown.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Counters.
    pub metrics: Arc<RelayMetrics>,
    heartbeat: HeartbeatConfig,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("clients", &self.registry.size())
            .field("shutting_down", &self.shutdown.is_shutting_down())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a relay engine with all subsystems wired to one registry.
    pub fn new(config: &RealtimeConfig, shutdown_grace: Duration) -> Self {
        let metrics = Arc::new(RelayMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let lifecycle = Arc::new(LifecycleManager::new(
            registry.clone(),
            metrics.clone(),
            config.outbound_buffer_size,
            config.send_timeout(),
        ));
        let broadcaster = Arc::new(BroadcastEngine::new(
            registry.clone(),
            lifecycle.clone(),
            metrics.clone(),
        ));
        let gateway = Arc::new(IngestGateway::new(
            broadcaster.clone(),
            lifecycle.clone(),
            metrics.clone(),
            config.max_message_bytes,
        ));
        let shutdown = Arc::new(ShutdownCoordinator::new(
            lifecycle.clone(),
            broadcaster.clone(),
            shutdown_grace,
        ));

        info!(
            buffer = config.outbound_buffer_size,
            send_timeout_ms = config.send_timeout_ms,
            ping_secs = config.ping_interval_seconds,
            idle_secs = config.idle_timeout_seconds,
            "Relay engine initialized"
        );

        Self {
            registry,
            lifecycle,
            broadcaster,
            gateway,
            shutdown,
            metrics,
            heartbeat: HeartbeatConfig::from(config),
        }
    }

    /// Registers a new subscriber and queues its welcome message.
    pub async fn open_connection(
        &self,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<OutboundFrame>), RelayError> {
        self.lifecycle.open().await
    }

    /// Starts the heartbeat for an open connection.
    pub fn spawn_heartbeat(&self, connection: Arc<Connection>) -> JoinHandle<()> {
        self.shutdown.spawn(run_heartbeat(
            self.lifecycle.clone(),
            connection,
            self.heartbeat,
        ))
    }

    /// Wraps a connection task so shutdown waits for it.
    pub fn track<F: Future>(&self, task: F) -> TrackedFuture<F> {
        self.shutdown.track(task)
    }

    /// Handles one frame read from a connection's socket.
    ///
    /// Returns the reason to close the connection, if the frame ends it.
    pub async fn handle_frame(
        &self,
        connection: &Connection,
        frame: InboundFrame,
    ) -> Option<CloseReason> {
        connections::record_frame(&self.metrics);
        match frame {
            InboundFrame::Text(text) => {
                connection.record_seen();
                if let Err(err) = self.gateway.receive_frame(connection, &text).await {
                    debug!(conn_id = %connection.id, error = %err, "Frame not relayed");
                }
                None
            }
            InboundFrame::Heartbeat => {
                self.lifecycle.record_heartbeat(connection);
                None
            }
            InboundFrame::Close => Some(CloseReason::PeerClosed),
            InboundFrame::Fault(reason) => Some(CloseReason::TransportFault(reason)),
        }
    }

    /// Closes a connection. Idempotent.
    pub fn close_connection(&self, connection: &Connection, reason: CloseReason) -> bool {
        self.lifecycle.close(connection, reason)
    }

    /// Marks a closing connection `Closed` once its socket is gone.
    pub fn release_connection(&self, connection: &Connection) -> bool {
        self.lifecycle.release(connection)
    }

    /// One-shot producer submission.
    pub async fn submit(&self, body: &[u8]) -> Result<IngestReceipt, RelayError> {
        self.gateway.submit(body).await
    }

    /// Number of registered connections.
    pub fn connected_clients(&self) -> usize {
        self.registry.size()
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether new connections are admitted.
    pub fn is_accepting(&self) -> bool {
        !self.shutdown.is_shutting_down()
    }

    /// Initiates graceful shutdown and waits for it to finish.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown.shutdown().await
    }
}
