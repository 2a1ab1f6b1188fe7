//! Validated tick payloads and the stamped envelope that gets broadcast.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use tickrelay_core::types::{ConnectionId, iso8601};

use crate::error::RelayError;

/// Reason reported when a payload lacks a `data` array.
pub const INVALID_FORMAT: &str = "Invalid data format";
/// Reason reported for an empty body.
pub const EMPTY_BODY: &str = "Empty request body";
/// Description of the accepted shape, echoed in rejections.
pub const EXPECTED_SHAPE: &str = "JSON with 'data' array property";

const DATA_FIELD: &str = "data";
const SERVER_TIMESTAMP_FIELD: &str = "server_timestamp";
const SERVER_RECEIVED_FIELD: &str = "server_received";

/// A producer payload that passed shape validation.
///
/// `data` is the ordered sequence of ticks; any other top-level fields the
/// producer sent travel along untouched in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct TickBatch {
    data: Vec<Value>,
    extra: Map<String, Value>,
}

impl TickBatch {
    /// Decodes raw bytes into a batch.
    ///
    /// Empty input and a missing/non-array `data` field are
    /// [`RelayError::InvalidPayload`]; unparseable JSON is
    /// [`RelayError::MalformedEncoding`].
    pub fn decode(raw: &[u8]) -> Result<Self, RelayError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::invalid_payload(EMPTY_BODY, Value::Null));
        }
        let value: Value = serde_json::from_slice(raw).map_err(RelayError::MalformedEncoding)?;
        Self::from_value(value)
    }

    /// Validates an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => return Err(RelayError::invalid_payload(INVALID_FORMAT, other)),
        };

        match fields.remove(DATA_FIELD) {
            Some(Value::Array(data)) => {
                fields.remove(SERVER_TIMESTAMP_FIELD);
                fields.remove(SERVER_RECEIVED_FIELD);
                Ok(Self { data, extra: fields })
            }
            other => {
                if let Some(data) = other {
                    fields.insert(DATA_FIELD.to_string(), data);
                }
                Err(RelayError::invalid_payload(
                    INVALID_FORMAT,
                    Value::Object(fields),
                ))
            }
        }
    }

    /// The ticks, in producer order.
    pub fn ticks(&self) -> &[Value] {
        &self.data
    }

    /// Number of ticks in the batch.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the batch carries no ticks.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `symbol` of the first tick, if it has one.
    pub fn first_symbol(&self) -> Option<&str> {
        self.data.first()?.get("symbol")?.as_str()
    }
}

/// An immutable, server-stamped message ready for fan-out.
#[derive(Debug, Clone)]
pub struct TickMessage {
    batch: TickBatch,
    server_timestamp: DateTime<Utc>,
    source: Option<ConnectionId>,
}

#[derive(Serialize)]
struct WireTick<'a> {
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
    data: &'a [Value],
    server_timestamp: String,
    server_received: bool,
}

impl TickMessage {
    /// Stamps a batch with the current server time.
    pub fn stamp(batch: TickBatch, source: Option<ConnectionId>) -> Self {
        Self {
            batch,
            server_timestamp: Utc::now(),
            source,
        }
    }

    /// The validated payload.
    pub fn batch(&self) -> &TickBatch {
        &self.batch
    }

    /// When the relay received the update.
    pub fn server_timestamp(&self) -> DateTime<Utc> {
        self.server_timestamp
    }

    /// Connection the update arrived on, if it came over the persistent channel.
    pub fn source(&self) -> Option<ConnectionId> {
        self.source
    }

    /// Serializes the JSON text frame delivered to subscribers.
    pub fn to_wire(&self) -> Result<String, RelayError> {
        let wire = WireTick {
            extra: &self.batch.extra,
            data: &self.batch.data,
            server_timestamp: iso8601(&self.server_timestamp),
            server_received: true,
        };
        serde_json::to_string(&wire).map_err(RelayError::Encoding)
    }
}
