//! Message metrics helpers.

use std::sync::atomic::Ordering;

use super::RelayMetrics;

/// Record an update accepted for broadcast
pub fn record_ingested(metrics: &RelayMetrics) {
    metrics.messages_ingested.fetch_add(1, Ordering::Relaxed);
}

/// Record an update rejected by validation
pub fn record_rejected(metrics: &RelayMetrics) {
    metrics.messages_rejected.fetch_add(1, Ordering::Relaxed);
}

/// Record one broadcast and its per-connection outcome
pub fn record_broadcast(metrics: &RelayMetrics, succeeded: usize, failed: usize) {
    metrics.broadcasts.fetch_add(1, Ordering::Relaxed);
    metrics
        .deliveries_succeeded
        .fetch_add(succeeded as u64, Ordering::Relaxed);
    metrics
        .deliveries_failed
        .fetch_add(failed as u64, Ordering::Relaxed);
}
