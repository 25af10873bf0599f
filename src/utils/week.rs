//! Sunday-aligned week arithmetic shared by the collector and the
//! aggregator.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

/// Number of weeks shown when no day window is requested.
pub const DEFAULT_WEEKS: i64 = 52;

/// Truncates a timestamp to 00:00:00 UTC of the Sunday starting its week.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use orgstats::utils::week_start_of;
///
/// let wed = Utc.with_ymd_and_hms(2024, 1, 10, 15, 30, 0).unwrap();
/// let sun = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();
/// assert_eq!(week_start_of(wed), sun);
/// ```
pub fn week_start_of(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = ts.date_naive();
    let sunday = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));
    sunday.and_time(NaiveTime::MIN).and_utc()
}

/// Number of weekly buckets covering a day window, rounded up so a partial
/// trailing week still gets a bucket. Without a window the default year-long
/// span applies.
pub fn weeks_in_window(window_days: Option<i64>) -> i64 {
    match window_days {
        Some(days) if days > 0 => (days + 6) / 7,
        Some(_) => 1,
        None => DEFAULT_WEEKS,
    }
}

/// The contiguous run of week starts ending at the week containing `end`,
/// oldest first.
pub fn week_window(end: DateTime<Utc>, weeks: i64) -> Vec<DateTime<Utc>> {
    let last = week_start_of(end);
    (0..weeks)
        .rev()
        .map(|back| last - Duration::weeks(back))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_week_start_midweek() {
        // Wednesday 2024-01-10 belongs to the week of Sunday 2024-01-07.
        assert_eq!(week_start_of(at(2024, 1, 10, 15)), at(2024, 1, 7, 0));
    }

    #[test]
    fn test_week_start_on_sunday() {
        // A Sunday is its own week start, truncated to midnight.
        assert_eq!(week_start_of(at(2024, 1, 7, 23)), at(2024, 1, 7, 0));
    }

    #[test]
    fn test_week_start_crosses_month() {
        // Friday 2024-03-01 falls in the week of Sunday 2024-02-25.
        assert_eq!(week_start_of(at(2024, 3, 1, 8)), at(2024, 2, 25, 0));
    }

    #[test]
    fn test_weeks_in_window_rounds_up() {
        assert_eq!(weeks_in_window(Some(7)), 1);
        assert_eq!(weeks_in_window(Some(8)), 2);
        assert_eq!(weeks_in_window(Some(30)), 5);
        assert_eq!(weeks_in_window(Some(90)), 13);
        assert_eq!(weeks_in_window(Some(1)), 1);
    }

    #[test]
    fn test_weeks_in_window_defaults_to_a_year() {
        assert_eq!(weeks_in_window(None), DEFAULT_WEEKS);
    }

    #[test]
    fn test_week_window_is_contiguous_and_ascending() {
        let window = week_window(at(2024, 3, 1, 8), 4);
        assert_eq!(
            window,
            vec![
                at(2024, 2, 4, 0),
                at(2024, 2, 11, 0),
                at(2024, 2, 18, 0),
                at(2024, 2, 25, 0),
            ]
        );
    }
}
