//! Timestamp helpers for API responses.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// SQLite `datetime('now')` layout. Stored values are UTC.
pub const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a stored timestamp to RFC3339 (`2024-01-15T10:30:00Z`).
///
/// Values already in RFC3339 are normalized to UTC. Anything unparseable is
/// returned unchanged.
pub fn to_rfc3339(datetime_str: &str) -> String {
    if let Ok(naive) = NaiveDateTime::parse_from_str(datetime_str, SQLITE_DATETIME_FORMAT) {
        return naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    datetime_str.to_string()
}
