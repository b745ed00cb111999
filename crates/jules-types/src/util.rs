use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp in the fixed-width form used by every persisted table.
///
/// Always UTC, always nanosecond precision, always a trailing `Z`, so that
/// lexical order of the stored text matches chronological order and a
/// round-trip through storage returns the exact same instant.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
