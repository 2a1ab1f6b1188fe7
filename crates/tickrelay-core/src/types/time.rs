//! Wire timestamp formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp as RFC 3339 with millisecond precision and a `Z`
/// suffix, e.g. `2024-05-01T12:00:00.123Z`.
pub fn iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// [`iso8601`] applied to the current time.
pub fn now_iso8601() -> String {
    iso8601(&Utc::now())
}
