//! Transport-level frames exchanged between a connection task and the relay.

use std::sync::Arc;

/// A frame queued for delivery on a connection's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A JSON text frame. Shared so one serialization serves every recipient.
    Text(Arc<str>),
    /// A heartbeat probe.
    Ping,
}

impl OutboundFrame {
    /// Wraps already-serialized JSON.
    pub fn text(json: impl Into<Arc<str>>) -> Self {
        Self::Text(json.into())
    }
}

/// A transport event read from a connection's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// An application message (text, or binary holding UTF-8).
    Text(String),
    /// A ping or pong from the peer.
    Heartbeat,
    /// The peer closed the channel, or the stream ended.
    Close,
    /// The transport reported an error.
    Fault(String),
}
