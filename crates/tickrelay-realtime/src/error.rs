//! Relay error taxonomy.
//!
//! Per-connection faults (`DeliveryFailure`, `TransportFault`) are handled
//! where they occur and never surface to other connections or to the caller
//! of a broadcast. Only registry-level faults propagate upward.

use serde_json::Value;
use thiserror::Error;

use tickrelay_core::error::{AppError, ErrorKind};
use tickrelay_core::types::ConnectionId;

/// Errors raised by the registry, broadcast engine, and ingest gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Inbound data parsed but did not have the required shape.
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// What was wrong with the payload.
        reason: String,
        /// The document as received, echoed back to the producer.
        received: Value,
    },

    /// Inbound data could not be parsed at all.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[source] serde_json::Error),

    /// Queueing a frame to one connection failed.
    #[error("delivery to {id} failed: {reason}")]
    DeliveryFailure {
        /// The connection that could not be reached.
        id: ConnectionId,
        /// Why the send failed.
        reason: String,
    },

    /// The connection's channel reported an unexpected error.
    #[error("transport fault on {id}: {reason}")]
    TransportFault {
        /// The faulting connection.
        id: ConnectionId,
        /// Transport error description.
        reason: String,
    },

    /// A connection id was registered twice.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    /// The registry stopped accepting connections because shutdown began.
    #[error("connection registry is closed")]
    RegistryClosed,

    /// An outbound message could not be serialized.
    #[error("failed to encode outbound message: {0}")]
    Encoding(#[source] serde_json::Error),
}

impl RelayError {
    /// Builds an [`RelayError::InvalidPayload`].
    pub fn invalid_payload(reason: impl Into<String>, received: Value) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
            received,
        }
    }

    /// Builds a [`RelayError::DeliveryFailure`].
    pub fn delivery(id: ConnectionId, reason: impl Into<String>) -> Self {
        Self::DeliveryFailure {
            id,
            reason: reason.into(),
        }
    }

    /// Builds a [`RelayError::TransportFault`].
    pub fn transport(id: ConnectionId, reason: impl Into<String>) -> Self {
        Self::TransportFault {
            id,
            reason: reason.into(),
        }
    }

    /// The application-wide category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPayload { .. } => ErrorKind::Validation,
            Self::MalformedEncoding(_) => ErrorKind::Validation,
            Self::DeliveryFailure { .. } | Self::TransportFault { .. } => ErrorKind::Transport,
            Self::DuplicateConnection(_) => ErrorKind::Conflict,
            Self::RegistryClosed => ErrorKind::ServiceUnavailable,
            Self::Encoding(_) => ErrorKind::Serialization,
        }
    }

    /// Machine-readable code used in error frames sent to the producer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
            Self::MalformedEncoding(_) => "MALFORMED_ENCODING",
            Self::DeliveryFailure { .. } => "DELIVERY_FAILURE",
            Self::TransportFault { .. } => "TRANSPORT_FAULT",
            Self::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
            Self::RegistryClosed => "SHUTTING_DOWN",
            Self::Encoding(_) => "ENCODING",
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        let kind = err.kind();
        AppError::with_source(kind, err.to_string(), err)
    }
}
