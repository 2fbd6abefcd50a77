//! Small helpers shared across modules.
//!
//! - Run timestamps in the format written to `fetched_at`
//! - String truncation for logging response bodies

use chrono::{DateTime, SecondsFormat, Utc};

/// Format `at` as ISO-8601 with microseconds and an explicit `+00:00` offset,
/// e.g. `2024-05-22T20:15:00.123456+00:00`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// The current UTC time as an [`iso_timestamp`].
pub fn utc_now() -> String {
    iso_timestamp(Utc::now())
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary) with
/// an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "é" is two bytes; cutting at 1 would split it.
        assert_eq!(truncate_for_log("éé", 1), "…(+4 bytes)");
    }

    #[test]
    fn test_iso_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 22, 20, 15, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2024-05-22T20:15:00.000000+00:00");
        assert!(utc_now().ends_with("+00:00"));
    }
}
