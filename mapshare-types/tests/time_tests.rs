use chrono::{TimeZone, Utc};
use mapshare_types::{base62_encode, base62_time, now, parse_timestamp, Error, BASE62_ALPHABET};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn decode(s: &str) -> u64 {
    s.bytes().fold(0u64, |acc, b| {
        let digit = BASE62_ALPHABET.iter().position(|&c| c == b).unwrap() as u64;
        acc * 62 + digit
    })
}

// ── base62 ────────────────────────────────────────────────────────

#[test]
fn base62_zero() {
    assert_eq!(base62_encode(0), "0");
}

#[test]
fn base62_small_values() {
    assert_eq!(base62_encode(9), "9");
    assert_eq!(base62_encode(10), "a");
    assert_eq!(base62_encode(61), "Z");
    assert_eq!(base62_encode(62), "10");
    assert_eq!(base62_encode(62 * 62), "100");
}

#[test]
fn base62_time_uses_milliseconds() {
    let at = Utc.timestamp_millis_opt(1_000).unwrap();
    assert_eq!(base62_time(at), base62_encode(1_000));
}

#[test]
fn base62_time_is_url_safe() {
    let encoded = base62_time(now());
    assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric()));
}

proptest! {
    #[test]
    fn base62_decodes_back(value in any::<u64>()) {
        prop_assert_eq!(decode(&base62_encode(value)), value);
    }
}

// ── now ───────────────────────────────────────────────────────────

#[test]
fn now_is_millisecond_precision() {
    let t = now();
    assert_eq!(t.timestamp_subsec_nanos() % 1_000_000, 0);
}

#[test]
fn parse_timestamp_accepts_stored_form() {
    let t = parse_timestamp("2024-03-01T12:30:00.250Z").unwrap();
    assert_eq!(t, Utc.timestamp_millis_opt(1_709_296_200_250).unwrap());
}

#[test]
fn parse_timestamp_normalizes_offsets_to_utc() {
    let t = parse_timestamp("2024-03-01T13:30:00+01:00").unwrap();
    assert_eq!(t, parse_timestamp("2024-03-01T12:30:00Z").unwrap());
}

#[test]
fn parse_timestamp_rejects_garbage() {
    let err = parse_timestamp("yesterday").unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp(_)));
    assert!(err.to_string().contains("yesterday"));
}
