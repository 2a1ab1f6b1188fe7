//! # tickrelay-realtime
//!
//! Real-time relay engine for TickRelay. Provides:
//!
//! - Subscriber connection tracking with an explicit lifecycle state machine
//! - Concurrent fan-out of tick updates with per-connection failure isolation
//! - A single ingest path for one-shot and streaming producer updates
//! - Ping heartbeat with idle timeout
//! - Graceful shutdown that drains in-flight broadcasts and connection tasks

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod ingest;
pub mod message;
pub mod metrics;
pub mod server;
pub mod shutdown;

pub use broadcast::{BroadcastEngine, BroadcastReport};
pub use connection::{CloseReason, Connection, ConnectionRegistry, ConnectionState, LifecycleManager};
pub use error::RelayError;
pub use ingest::{IngestGateway, IngestReceipt};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use server::RealtimeEngine;
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
