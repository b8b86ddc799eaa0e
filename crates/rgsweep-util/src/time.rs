//! Time utilities for rgsweep
//!
//! All policy decisions are made in UTC. Timestamps arrive from several
//! sources (resource metadata, tags written by people or by older tooling),
//! so parsing is deliberately lenient while formatting is always RFC 3339.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `RGSWEEP_MOCK_TIME` environment variable can be set
//! to override the system time for all TTL decisions. This is useful for
//! checking what a run *would* delete at some future point.
//!
//! Format: `YYYY-MM-DD HH:MM:SS`, interpreted as UTC (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! RGSWEEP_MOCK_TIME="2025-12-25 14:30:00" rgsweep --dry-run
//! ```

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "RGSWEEP_MOCK_TIME";

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Naive layouts accepted for tag values, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Offset-carrying layouts accepted for tag values. The first is the
/// general date/time pattern produced by .NET's `DateTimeOffset.ToString()`.
const OFFSET_FORMATS: &[&str] = &["%m/%d/%Y %I:%M:%S %p %:z", "%Y-%m-%d %H:%M:%S %:z"];

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    Ok(naive_dt) => {
                        let mock_dt = Utc.from_utc_datetime(&naive_dt);
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
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

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
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

/// Get the current UTC time from the system clock, ignoring mock time.
///
/// For token lifetimes and signed assertions, which the identity service
/// checks against its own clock.
pub fn system_now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a timestamp from free-form text such as a resource tag value.
///
/// Accepts RFC 3339, a handful of naive layouts (taken as UTC) and the .NET
/// general format with an explicit offset. Returns `None` for anything else.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp the way rgsweep writes it back onto resources.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Helper to format an age in human-readable form, e.g. `8d 3h` or `45m`.
pub fn format_age(age: chrono::Duration) -> String {
    if age < chrono::Duration::zero() {
        return format!("-{}", format_age(-age));
    }

    let days = age.num_days();
    let hours = age.num_hours() % 24;
    let minutes = age.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2025-12-25T14:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 0).unwrap());

        let dt = parse_timestamp("2025-12-25T16:30:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 0).unwrap());

        // Resource Manager emits seven fractional digits
        let dt = parse_timestamp("2025-12-25T14:30:00.1234567Z").unwrap();
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_dotnet_general_format() {
        let dt = parse_timestamp("10/19/2025 3:04:05 PM +00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 10, 19, 15, 4, 5).unwrap());

        let dt = parse_timestamp("1/2/2025 9:00:00 AM +08:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 2, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let dt = parse_timestamp("2025-12-25 14:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 0).unwrap());

        let dt = parse_timestamp("  2025-12-25T14:30:00  ").unwrap();
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let invalid = ["", "   ", "not a date", "2025-13-45", "yesterday", "1700000000"];
        for value in &invalid {
            assert!(
                parse_timestamp(value).is_none(),
                "Expected '{}' to be rejected",
                value
            );
        }
    }

    #[test]
    fn test_format_timestamp_round_trips_through_parse() {
        let dt = Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        let text = format_timestamp(&dt);
        assert_eq!(text, "2025-12-25T14:30:45Z");
        assert_eq!(parse_timestamp(&text), Some(dt));
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::minutes(45)), "45m");
        assert_eq!(format_age(chrono::Duration::minutes(150)), "2h 30m");
        assert_eq!(format_age(chrono::Duration::hours(200)), "8d 8h");
        assert_eq!(format_age(chrono::Duration::hours(-3)), "-3h 0m");
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_system_now_follows_real_clock() {
        let before = Utc::now();
        let t = system_now();
        let after = Utc::now();
        assert!(before <= t && t <= after);

        // now() differs only by the mock offset, if any
        if !is_mock_time_active() {
            assert!((now() - system_now()).num_seconds().abs() < 5);
        }
    }

    #[test]
    fn test_mock_time_env_var_name() {
        assert_eq!(MOCK_TIME_ENV_VAR, "RGSWEEP_MOCK_TIME");
        assert!(NaiveDateTime::parse_from_str("2025-12-25 14:30:00", MOCK_TIME_FORMAT).is_ok());
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_is_mock_time_active_in_debug() {
        // OnceLock makes the env var impossible to toggle here; just make sure it doesn't panic
        let _ = is_mock_time_active();
    }
}
