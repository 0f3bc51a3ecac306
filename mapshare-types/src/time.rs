//! Wall-clock helpers.
//!
//! All persisted timestamps are UTC with millisecond precision, which is what
//! SQLite round-trips through RFC 3339 text without loss.

use crate::{Error, Result};
use chrono::{DateTime, SubsecRound, Utc};

/// Timestamp type stored on every record.
pub type Timestamp = DateTime<Utc>;

/// Digits used by [`base62_encode`], lowest value first.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Returns the current time truncated to milliseconds.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Parses an RFC 3339 timestamp as stored in the database.
pub fn parse_timestamp(text: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp(format!("{text:?}: {e}")))
}

/// Encodes `value` in base 62 using [`BASE62_ALPHABET`].
#[must_use]
pub fn base62_encode(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    // Alphabet is ASCII.
    String::from_utf8(digits).unwrap_or_default()
}

/// Base62 encoding of the given instant in milliseconds since the Unix epoch.
///
/// Used as the unique prefix of generated attachment paths.
#[must_use]
pub fn base62_time(at: Timestamp) -> String {
    base62_encode(at.timestamp_millis().max(0) as u64)
}
