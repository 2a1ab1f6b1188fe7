//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tickrelay_core::config::AppConfig;
use tickrelay_realtime::RealtimeEngine;

/// Application state.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Relay engine
    pub realtime: Arc<RealtimeEngine>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state and its relay engine from configuration.
    pub fn new(config: AppConfig) -> Self {
        let realtime = RealtimeEngine::new(
            &config.realtime,
            Duration::from_secs(config.server.shutdown_grace_seconds),
        );
        Self {
            config: Arc::new(config),
            realtime: Arc::new(realtime),
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server started.
    pub fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
