//! Date/time display helpers for cloudshelf.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Default format for absolute dates.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC when the timezone name is not recognized.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Format a modification time relative to `now`.
///
/// Days are counted between calendar dates in `timezone`:
/// - same day: "Today"
/// - one day before: "Yesterday"
/// - two to six days before: "N days ago"
/// - anything else, including future times: the date
pub fn format_relative_date(dt: &DateTime<Utc>, now: &DateTime<Utc>, timezone: &str) -> String {
    let tz: Tz = timezone.parse().unwrap_or(Tz::UTC);
    let day = dt.with_timezone(&tz).date_naive();
    let today = now.with_timezone(&tz).date_naive();

    match (today - day).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        n @ 2..=6 => format!("{n} days ago"),
        _ => format_utc_datetime(dt, timezone, DATE_FORMAT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_format_utc_datetime() {
        let dt = at(2024, 1, 15, 10);
        let result = format_utc_datetime(&dt, "Asia/Tokyo", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 19:00");
    }

    #[test]
    fn test_format_utc_datetime_invalid_timezone() {
        let dt = at(2024, 1, 15, 10);
        let result = format_utc_datetime(&dt, "Invalid/Zone", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 10:00");
    }

    #[test]
    fn test_relative_today() {
        let now = at(2024, 3, 10, 18);
        assert_eq!(format_relative_date(&at(2024, 3, 10, 1), &now, "UTC"), "Today");
    }

    #[test]
    fn test_relative_yesterday() {
        let now = at(2024, 3, 10, 1);
        assert_eq!(
            format_relative_date(&at(2024, 3, 9, 23), &now, "UTC"),
            "Yesterday"
        );
    }

    #[test]
    fn test_relative_days_ago() {
        let now = at(2024, 3, 10, 12);
        assert_eq!(
            format_relative_date(&at(2024, 3, 7, 12), &now, "UTC"),
            "3 days ago"
        );
        assert_eq!(
            format_relative_date(&at(2024, 3, 4, 12), &now, "UTC"),
            "6 days ago"
        );
    }

    #[test]
    fn test_relative_falls_back_to_date() {
        let now = at(2024, 3, 10, 12);
        assert_eq!(
            format_relative_date(&at(2024, 3, 3, 12), &now, "UTC"),
            "2024/03/03"
        );
        assert_eq!(
            format_relative_date(&at(2024, 3, 12, 12), &now, "UTC"),
            "2024/03/12"
        );
    }

    #[test]
    fn test_relative_uses_timezone_calendar() {
        // 2024-03-09 20:00 UTC is already 2024-03-10 in Tokyo.
        let now = at(2024, 3, 10, 3);
        let dt = at(2024, 3, 9, 20);
        assert_eq!(format_relative_date(&dt, &now, "UTC"), "Yesterday");
        assert_eq!(format_relative_date(&dt, &now, "Asia/Tokyo"), "Today");
    }
}
