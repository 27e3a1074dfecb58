//! `get_current_time` tool.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Timezone label reported when the requested zone is unknown.
pub const INVALID_TIMEZONE_LABEL: &str = "UTC (invalid timezone provided)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// RFC 3339 with offset, e.g. `2025-01-01T09:00:00.000000+09:00`.
    Iso,
    /// `YYYY-MM-DD HH:MM:SS <zone abbreviation>`.
    Locale,
    /// Unix seconds.
    Timestamp,
}

impl TimeFormat {
    /// Unknown formats fall back to ISO.
    pub fn parse(format: &str) -> Self {
        match format {
            "locale" => TimeFormat::Locale,
            "timestamp" => TimeFormat::Timestamp,
            _ => TimeFormat::Iso,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CurrentTime {
    pub current_time: String,
    pub timezone: String,
    /// The format as requested, even when it fell back to ISO.
    pub format: String,
    pub utc_timestamp: i64,
    pub day_of_week: String,
    pub day_of_year: u32,
}

/// Current time in `timezone`, rendered as `format`.
pub fn current_time(timezone: &str, format: &str) -> CurrentTime {
    current_time_at(Utc::now(), timezone, format)
}

pub(crate) fn current_time_at(now: DateTime<Utc>, timezone: &str, format: &str) -> CurrentTime {
    let (zone, label) = if timezone.eq_ignore_ascii_case("UTC") {
        (Tz::UTC, timezone.to_string())
    } else {
        match timezone.parse::<Tz>() {
            Ok(zone) => (zone, timezone.to_string()),
            Err(_) => {
                tracing::debug!(target: "fh.services.clock", timezone, "Unknown timezone, using UTC");
                (Tz::UTC, INVALID_TIMEZONE_LABEL.to_string())
            }
        }
    };

    let local = now.with_timezone(&zone);
    let current_time = match TimeFormat::parse(format) {
        TimeFormat::Iso => local.to_rfc3339_opts(SecondsFormat::Micros, false),
        TimeFormat::Locale => local.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        TimeFormat::Timestamp => local.timestamp().to_string(),
    };

    CurrentTime {
        current_time,
        timezone: label,
        format: format.to_string(),
        utc_timestamp: now.timestamp(),
        day_of_week: local.format("%A").to_string(),
        day_of_year: local.ordinal(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        // Tuesday 2024-12-31 20:30:00 UTC, already 2025 in Tokyo
        Utc.with_ymd_and_hms(2024, 12, 31, 20, 30, 0).unwrap()
    }

    #[test]
    fn test_utc_iso() {
        let result = current_time_at(fixed_now(), "UTC", "iso");

        assert_eq!(result.current_time, "2024-12-31T20:30:00.000000+00:00");
        assert_eq!(result.timezone, "UTC");
        assert_eq!(result.format, "iso");
        assert_eq!(result.utc_timestamp, 1_735_677_000);
        assert_eq!(result.day_of_week, "Tuesday");
        assert_eq!(result.day_of_year, 366);
    }

    #[test]
    fn test_utc_is_case_insensitive() {
        let result = current_time_at(fixed_now(), "utc", "timestamp");
        assert_eq!(result.timezone, "utc");
        assert_eq!(result.current_time, "1735677000");
    }

    #[test]
    fn test_named_timezone_crosses_date_line() {
        let result = current_time_at(fixed_now(), "Asia/Tokyo", "locale");

        assert_eq!(result.current_time, "2025-01-01 05:30:00 JST");
        assert_eq!(result.timezone, "Asia/Tokyo");
        assert_eq!(result.day_of_week, "Wednesday");
        assert_eq!(result.day_of_year, 1);
        // utc_timestamp is zone independent
        assert_eq!(result.utc_timestamp, 1_735_677_000);
    }

    #[test]
    fn test_invalid_timezone_falls_back_to_utc() {
        let result = current_time_at(fixed_now(), "Mars/Olympus_Mons", "iso");

        assert_eq!(result.timezone, INVALID_TIMEZONE_LABEL);
        assert!(result.current_time.ends_with("+00:00"));
    }

    #[test]
    fn test_unknown_format_falls_back_to_iso() {
        let result = current_time_at(fixed_now(), "Asia/Tokyo", "rfc2822");

        assert_eq!(result.current_time, "2025-01-01T05:30:00.000000+09:00");
        assert_eq!(result.format, "rfc2822");
    }

    #[test]
    fn test_time_format_parse() {
        assert_eq!(TimeFormat::parse("iso"), TimeFormat::Iso);
        assert_eq!(TimeFormat::parse("locale"), TimeFormat::Locale);
        assert_eq!(TimeFormat::parse("timestamp"), TimeFormat::Timestamp);
        assert_eq!(TimeFormat::parse("ISO"), TimeFormat::Iso);
    }
}
