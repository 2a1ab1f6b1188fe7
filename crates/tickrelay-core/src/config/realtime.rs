//! Real-time relay configuration: outbound queues, send bounds, heartbeat.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection registry and broadcast engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound frame queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Upper bound for queueing one frame to one connection, in milliseconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
    /// Interval between heartbeat pings, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// A connection silent for longer than this is closed, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Largest inbound frame accepted on the persistent channel, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl RealtimeConfig {
    /// Per-connection send bound.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Heartbeat ping interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Heartbeat idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            send_timeout_ms: default_send_timeout(),
            ping_interval_seconds: default_ping_interval(),
            idle_timeout_seconds: default_idle_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_send_timeout() -> u64 {
    2000
}

fn default_ping_interval() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    75
}

fn default_max_message_bytes() -> usize {
    1024 * 1024
}
