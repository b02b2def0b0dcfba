// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp formatting shared by every crate that touches storage.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::LicensorError;

/// Fixed-width UTC timestamp format. Matches SQLite's
/// `strftime('%Y-%m-%dT%H:%M:%fZ')` so SQL defaults and Rust-written values
/// compare correctly as strings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Calendar-day key used by rate limiting and credential windows.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Earliest date an empty credential `start_date` stands in for.
pub const EPOCH_DATE: &str = "1970-01-01";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Parses a stored timestamp. Accepts the canonical format and any RFC 3339 string.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, LicensorError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LicensorError::Validation(format!("invalid timestamp '{value}': {e}")))
}

/// Validates a `YYYY-MM-DD` date string. Empty strings are allowed.
pub fn validate_date(value: &str) -> Result<(), LicensorError> {
    if value.is_empty() {
        return Ok(());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| LicensorError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

/// Whole days from `now` until `expires_at`, never negative.
pub fn days_left(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> i64 {
    (expires_at - now).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_round_trips_and_sorts() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 11, 2, 3, 4, 5).unwrap();
        let sa = format_timestamp(a);
        let sb = format_timestamp(b);
        assert_eq!(sa, "2026-01-02T03:04:05.000Z");
        assert!(sa < sb);
        assert_eq!(parse_timestamp(&sa).unwrap(), a);
    }

    #[test]
    fn date_validation() {
        assert!(validate_date("").is_ok());
        assert!(validate_date("2026-02-28").is_ok());
        assert!(validate_date("2026-02-30").is_err());
        assert!(validate_date("26-1-1").is_err());
    }

    #[test]
    fn days_left_clamps_at_zero() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap();
        assert_eq!(days_left(now, later), 30);
        assert_eq!(days_left(later, now), 0);
    }
}
