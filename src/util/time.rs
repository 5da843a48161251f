use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

/// Zone-less layouts seen in the wild, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Layouts with an explicit numeric offset that RFC 2822/3339 reject.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%a, %d %b %Y %H:%M %z"];

#[derive(Debug, Error)]
pub enum DateError {
    #[error("unrecognized timestamp: {0:?}")]
    Unrecognized(String),
}

/// Parses a feed timestamp into UTC.
///
/// Accepts RFC 2822 (`Mon, 01 Jan 2024 00:00:00 GMT`), RFC 3339
/// (`2024-01-01T00:00:00Z`), a handful of zone-less variants (taken as UTC) and
/// bare dates.
pub fn parse_published(raw: &str) -> Result<DateTime<Utc>, DateError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(DateError::Unrecognized(trimmed.to_owned()))
}

/// Renders the distance between `then` and `now` in words.
///
/// Past instants read `"3 days ago"`, future ones `"in 3 days"`, and anything
/// within ten seconds is `"just now"`. Months are 30 days, years 365.
pub fn format_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then).num_seconds();
    let secs = delta.unsigned_abs();

    if secs < 10 {
        return "just now".to_owned();
    }

    let (count, unit) = match secs {
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < WEEK => (s / DAY, "day"),
        s if s < MONTH => (s / WEEK, "week"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    let plural = if count == 1 { "" } else { "s" };

    if delta < 0 {
        format!("in {count} {unit}{plural}")
    } else {
        format!("{count} {unit}{plural} ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jan_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_rfc2822_gmt() {
        let dt = parse_published("Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
        assert_eq!(dt, jan_first());
    }

    #[test]
    fn test_parse_rfc2822_offset_converted_to_utc() {
        let dt = parse_published("Mon, 01 Jan 2024 02:00:00 +0200").unwrap();
        assert_eq!(dt, jan_first());
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse_published("2024-01-01T00:00:00Z").unwrap(), jan_first());
        assert_eq!(
            parse_published("2024-01-01T01:00:00+01:00").unwrap(),
            jan_first()
        );
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        assert_eq!(parse_published("2024-01-01 00:00:00").unwrap(), jan_first());
        assert_eq!(parse_published("2024-01-01").unwrap(), jan_first());
        assert_eq!(parse_published("  2024-01-01T00:00:00  ").unwrap(), jan_first());
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(matches!(
            parse_published("sometime last week"),
            Err(DateError::Unrecognized(_))
        ));
        assert!(parse_published("").is_err());
    }

    #[test]
    fn test_format_ago_units() {
        let now = jan_first();
        assert_eq!(format_ago(now, now), "just now");
        assert_eq!(format_ago(now - Duration::seconds(30), now), "30 seconds ago");
        assert_eq!(format_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_ago(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_ago(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_ago(now - Duration::days(14), now), "2 weeks ago");
        assert_eq!(format_ago(now - Duration::days(90), now), "3 months ago");
        assert_eq!(format_ago(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_format_ago_future() {
        let now = jan_first();
        assert_eq!(format_ago(now + Duration::days(1), now), "in 1 day");
        assert_eq!(format_ago(now + Duration::hours(2), now), "in 2 hours");
    }
}
