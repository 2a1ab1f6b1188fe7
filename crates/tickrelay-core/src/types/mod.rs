//! Shared value types.

pub mod id;
pub mod time;

pub use id::ConnectionId;
pub use time::{iso8601, now_iso8601};
