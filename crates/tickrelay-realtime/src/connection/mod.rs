//! Subscriber connections: entity, registry, lifecycle, heartbeat.

pub mod handle;
pub mod heartbeat;
pub mod lifecycle;
pub mod registry;

pub use handle::{CloseReason, Connection, ConnectionState};
pub use heartbeat::{HeartbeatConfig, run_heartbeat};
pub use lifecycle::LifecycleManager;
pub use registry::ConnectionRegistry;
