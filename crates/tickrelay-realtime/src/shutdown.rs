//! Graceful shutdown coordination.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TrackedFuture;
use tracing::{info, warn};

use crate::broadcast::BroadcastEngine;
use crate::connection::{CloseReason, ConnectionState, LifecycleManager};

/// What a shutdown accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Connections that started closing because of the shutdown.
    pub closing: usize,
    /// Of those, the ones whose transport was released within the grace
    /// period and reached `Closed`.
    pub closed: usize,
    /// Connection tasks that finished within the grace period.
    pub drained: usize,
    /// Whether the grace period ran out with tasks still running.
    pub timed_out: bool,
}

/// Stops intake, closes every connection, and waits for connection tasks to
/// release their sockets.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    lifecycle: Arc<LifecycleManager>,
    broadcaster: Arc<BroadcastEngine>,
    tracker: TaskTracker,
    grace: Duration,
    report: OnceCell<ShutdownReport>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator that waits at most `grace` for connection tasks.
    pub fn new(
        lifecycle: Arc<LifecycleManager>,
        broadcaster: Arc<BroadcastEngine>,
        grace: Duration,
    ) -> Self {
        Self {
            lifecycle,
            broadcaster,
            tracker: TaskTracker::new(),
            grace,
            report: OnceCell::new(),
        }
    }

    /// Spawns a connection task that shutdown will wait for.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Wraps a future so shutdown waits for it without spawning it.
    pub fn track<F: Future>(&self, task: F) -> TrackedFuture<F> {
        self.tracker.track_future(task)
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.lifecycle.registry().is_closed()
    }

    /// Number of connection tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Runs the shutdown sequence once; later and concurrent calls wait for
    /// and return the same report.
    pub async fn shutdown(&self) -> ShutdownReport {
        *self.report.get_or_init(|| self.run()).await
    }

    async fn run(&self) -> ShutdownReport {
        info!(
            clients = self.lifecycle.registry().size(),
            "Shutdown started, refusing new connections"
        );
        self.lifecycle.registry().close();

        self.broadcaster.quiesce().await;
        let connections = self.lifecycle.registry().snapshot();
        let closing = self.lifecycle.close_all(CloseReason::Shutdown);

        self.tracker.close();
        let pending = self.tracker.len();
        let timed_out = tokio::time::timeout(self.grace, self.tracker.wait())
            .await
            .is_err();
        let drained = pending.saturating_sub(self.tracker.len());
        let closed = connections
            .iter()
            .filter(|connection| connection.state() == ConnectionState::Closed)
            .count();

        let report = ShutdownReport {
            closing,
            closed,
            drained,
            timed_out,
        };
        if timed_out {
            warn!(
                closing,
                closed,
                drained,
                remaining = self.tracker.len(),
                grace_secs = self.grace.as_secs(),
                "Shutdown grace period elapsed with connection tasks running"
            );
        } else {
            info!(closing, closed, drained, "Shutdown complete");
        }
        report
    }
}
