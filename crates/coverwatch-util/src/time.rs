//! Time utilities for coverwatch
//!
//! All instants are UTC. Calendar arithmetic (the end of a coverage day, the
//! calendar date an instant falls on) never consults the host's local
//! timezone, so window comparisons behave the same on every machine.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `COVERWATCH_MOCK_TIME` environment variable can be set
//! to override the service clock. The mock clock starts at the given UTC time
//! and advances with real time, which makes it easy to watch a sweep pick up
//! a policy that expired "just now".
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-01-01 00:30:00`)
//!
//! Example:
//! ```bash
//! COVERWATCH_MOCK_TIME="2025-01-01 00:30:00" coverwatchd run
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "COVERWATCH_MOCK_TIME";

/// Layout expected in [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_mock_time(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string as a UTC instant
pub fn parse_mock_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), MOCK_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Get the current UTC time, respecting mock time settings in debug builds.
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// The last representable instant of a calendar day (23:59:59.999999999 UTC)
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(last))
}

/// Calendar date of a UTC instant
pub fn date_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Convert a std duration to a chrono one, saturating on overflow
pub fn to_chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

/// Format a duration for logging (e.g. `30m`, `1h 5m`, `45s`)
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let rem = secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_end_of_day_is_last_nanosecond() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let eod = end_of_day(day);

        assert_eq!(eod.date_naive(), day);
        assert_eq!(eod.hour(), 23);
        assert_eq!(eod.minute(), 59);
        assert_eq!(eod.second(), 59);
        assert_eq!(eod.nanosecond(), 999_999_999);

        let next_midnight = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(next_midnight - eod, chrono::Duration::nanoseconds(1));
    }

    #[test]
    fn test_date_of_ignores_local_timezone() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap();
        assert_eq!(date_of(instant), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_mock_time_format() {
        let parsed = parse_mock_time("2025-01-01 00:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_mock_time_invalid_formats() {
        let invalid = [
            "2025-01-01",
            "00:30:00",
            "2025/01/01 00:30:00",
            "2025-13-01 00:30:00",
            "not a date",
        ];
        for s in invalid {
            assert!(parse_mock_time(s).is_none(), "{:?} should not parse", s);
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(1800)), "30m");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1h 5m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
    }

    #[test]
    fn test_now_returns_time() {
        let a = now();
        let b = now();
        assert!(b >= a);
    }
}
