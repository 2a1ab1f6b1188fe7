//! Connection metrics helpers.

use std::sync::atomic::Ordering;

use super::RelayMetrics;

/// Record a connection reaching `Open`
pub fn record_open(metrics: &RelayMetrics) {
    metrics.connections_total.fetch_add(1, Ordering::Relaxed);
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);
}

/// Record an `Open` connection closing
pub fn record_close(metrics: &RelayMetrics) {
    let _ = metrics
        .connections_active
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}

/// Record a frame read from a connection
pub fn record_frame(metrics: &RelayMetrics) {
    metrics.frames_received.fetch_add(1, Ordering::Relaxed);
}
