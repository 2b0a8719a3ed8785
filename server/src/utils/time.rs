//! Time utility functions

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Layouts accepted for timestamps without an offset, read as UTC
const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Convert nanoseconds since Unix epoch to DateTime<Utc>
pub fn nanos_to_datetime(nanos: u64) -> DateTime<Utc> {
    let secs = (nanos / 1_000_000_000) as i64;
    let nsecs = (nanos % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, nsecs).single().unwrap_or_else(|| {
        tracing::warn!(nanos, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Parse a timestamp embedded in log output.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.frac]` (space or `T` separated, UTC)
/// and numeric Unix timestamps in seconds, milliseconds, microseconds or
/// nanoseconds.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(n) = s.parse::<i64>() {
        return unix_to_datetime(n);
    }
    if let Ok(secs) = s.parse::<f64>()
        && secs.is_finite()
        && secs > 0.0
    {
        let nanos = (secs.fract() * 1e9) as u32;
        return DateTime::from_timestamp(secs.trunc() as i64, nanos);
    }
    None
}

/// Convert a Unix timestamp of unknown unit, inferring the unit from its magnitude.
/// Zero and negative values are rejected.
pub fn unix_to_datetime(n: i64) -> Option<DateTime<Utc>> {
    match n {
        ..=0 => None,
        1..100_000_000_000 => DateTime::from_timestamp(n, 0),
        100_000_000_000..100_000_000_000_000 => DateTime::from_timestamp_millis(n),
        100_000_000_000_000..100_000_000_000_000_000 => DateTime::from_timestamp_micros(n),
        _ => Some(DateTime::from_timestamp_nanos(n)),
    }
}
