//! Ping heartbeat and idle detection.

use std::sync::Arc;
use std::time::Duration;

use tickrelay_core::config::RealtimeConfig;
use tokio::time::{self, Instant};
use tracing;

use super::handle::{CloseReason, Connection};
use super::lifecycle::LifecycleManager;
use crate::message::OutboundFrame;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead
    pub idle_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Run the heartbeat loop for a connection.
///
/// Every `ping_interval` the connection is checked: if nothing was received
/// from the peer within `idle_timeout` it is closed with
/// [`CloseReason::HeartbeatTimeout`], otherwise a ping is queued. Ends when
/// the connection starts closing.
pub async fn run_heartbeat(
    lifecycle: Arc<LifecycleManager>,
    connection: Arc<Connection>,
    config: HeartbeatConfig,
) {
    let mut interval = time::interval_at(
        Instant::now() + config.ping_interval,
        config.ping_interval,
    );

    loop {
        tokio::select! {
            biased;
            _ = connection.closed() => break,
            _ = interval.tick() => {}
        }

        let idle = connection.idle_for();
        if idle > config.idle_timeout {
            tracing::warn!(
                conn_id = %connection.id,
                idle_ms = idle.as_millis() as u64,
                "Heartbeat timeout"
            );
            lifecycle.close(&connection, CloseReason::HeartbeatTimeout);
            break;
        }

        if let Err(err) = lifecycle.send(&connection, OutboundFrame::Ping).await {
            tracing::debug!(conn_id = %connection.id, error = %err, "Ping send failed");
            lifecycle.fail(&connection, &err);
            break;
        }
    }

    tracing::debug!(conn_id = %connection.id, "Heartbeat loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionRegistry;
    use crate::connection::handle::ConnectionState;
    use crate::metrics::RelayMetrics;

    fn lifecycle() -> Arc<LifecycleManager> {
        Arc::new(LifecycleManager::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(RelayMetrics::new()),
            16,
            Duration::from_millis(100),
        ))
    }

    const CONFIG: HeartbeatConfig = HeartbeatConfig {
        ping_interval: Duration::from_secs(1),
        idle_timeout: Duration::from_secs(3),
    };

    #[tokio::test(start_paused = true)]
    async fn test_pings_then_times_out_silent_peer() {
        let lifecycle = lifecycle();
        let (conn, mut rx) = lifecycle.open().await.unwrap();
        let task = tokio::spawn(run_heartbeat(lifecycle.clone(), conn.clone(), CONFIG));

        assert!(matches!(rx.recv().await, Some(OutboundFrame::Text(_))));
        assert_eq!(rx.recv().await, Some(OutboundFrame::Ping));

        task.await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Closing);
        assert_eq!(conn.close_reason(), Some(&CloseReason::HeartbeatTimeout));
        assert_eq!(lifecycle.registry().size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_connection_open() {
        let lifecycle = lifecycle();
        let (conn, _rx) = lifecycle.open().await.unwrap();
        let task = tokio::spawn(run_heartbeat(lifecycle.clone(), conn.clone(), CONFIG));

        for _ in 0..6 {
            time::sleep(Duration::from_secs(1)).await;
            lifecycle.record_heartbeat(&conn);
        }
        assert!(conn.is_open());

        lifecycle.close(&conn, CloseReason::PeerClosed);
        task.await.unwrap();
    }
}
