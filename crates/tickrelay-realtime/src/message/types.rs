//! Control messages the server sends on its own behalf.

use serde::{Deserialize, Serialize};

use tickrelay_core::types::now_iso8601;

use super::frame::OutboundFrame;
use crate::error::RelayError;

/// Greeting text sent with every welcome message.
pub const WELCOME_TEXT: &str = "Connected to TickRelay";

/// Messages originated by the server rather than relayed from a producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection confirmation, sent once right after the handshake.
    Welcome {
        /// Always `"connected"`.
        status: String,
        /// Human-readable greeting.
        message: String,
        /// Server time.
        timestamp: String,
    },
    /// Rejection of a frame received on the persistent channel.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Error description.
        message: String,
        /// Server time.
        timestamp: String,
    },
}

impl ServerMessage {
    /// The welcome message for a freshly opened connection.
    pub fn welcome() -> Self {
        Self::Welcome {
            status: "connected".to_string(),
            message: WELCOME_TEXT.to_string(),
            timestamp: now_iso8601(),
        }
    }

    /// An error frame describing why an inbound frame was rejected.
    pub fn error(err: &RelayError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            timestamp: now_iso8601(),
        }
    }

    /// Serializes into a text frame.
    pub fn to_frame(&self) -> Result<OutboundFrame, RelayError> {
        let json = serde_json::to_string(self).map_err(RelayError::Encoding)?;
        Ok(OutboundFrame::text(json))
    }
}
