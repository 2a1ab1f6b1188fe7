//! Relay metrics.

pub mod connections;
pub mod messages;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Relay-wide counters.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Connections ever opened
    pub connections_total: AtomicU64,
    /// Connections currently open
    pub connections_active: AtomicU64,
    /// Frames received on persistent connections
    pub frames_received: AtomicU64,
    /// Updates accepted by the ingest gateway
    pub messages_ingested: AtomicU64,
    /// Updates rejected by the ingest gateway
    pub messages_rejected: AtomicU64,
    /// Broadcasts dispatched
    pub broadcasts: AtomicU64,
    /// Frames queued successfully
    pub deliveries_succeeded: AtomicU64,
    /// Frames that could not be queued
    pub deliveries_failed: AtomicU64,
}

impl RelayMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            messages_ingested: self.messages_ingested.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever opened
    pub connections_total: u64,
    /// Connections currently open
    pub connections_active: u64,
    /// Frames received on persistent connections
    pub frames_received: u64,
    /// Updates accepted by the ingest gateway
    pub messages_ingested: u64,
    /// Updates rejected by the ingest gateway
    pub messages_rejected: u64,
    /// Broadcasts dispatched
    pub broadcasts: u64,
    /// Frames queued successfully
    pub deliveries_succeeded: u64,
    /// Frames that could not be queued
    pub deliveries_failed: u64,
}
