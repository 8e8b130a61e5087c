//! Calendar arithmetic
//!
//! All day boundaries are UTC midnight. Day differences are taken between
//! truncated dates, so they are always whole days regardless of the time of
//! day either instant was captured at.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Number of days in `month` (1-12) of `year`; 0 for an invalid month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Day of the week for a date, Sunday = 0 through Saturday = 6
pub fn day_of_week(year: i32, month: u32, day: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, day).map(weekday_of)
}

/// Sunday-based weekday index of a date
pub fn weekday_of(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Truncate an instant to its calendar day
pub fn date_only(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Whole calendar days from `b` to `a` (positive when `a` is later)
pub fn date_only_diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days()
}

/// Whole calendar days between two instants after truncating both
pub fn diff_days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    date_only_diff_days(date_only(a), date_only(b))
}

/// First and last day of a month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    Some((first, last))
}

/// Move `delta` months from (year, month), carrying across years
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// "YYYY-MM" key used for trend storage
pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2026, 1), 31);
        assert_eq!(days_in_month(2026, 4), 30);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2026, 13), 0);
        assert_eq!(days_in_month(2026, 0), 0);
    }

    #[test]
    fn test_days_in_month_agrees_with_chrono() {
        for year in [1999, 2000, 2023, 2024, 2100] {
            for month in 1..=12 {
                let (first, last) = month_bounds(year, month).unwrap();
                assert_eq!(first.day(), 1);
                assert_eq!(last.day(), days_in_month(year, month));
                assert_eq!(last.succ_opt().unwrap().day(), 1);
            }
        }
    }

    #[test]
    fn test_day_of_week_sunday_zero() {
        // 2026-03-01 is a Sunday
        assert_eq!(day_of_week(2026, 3, 1), Some(0));
        assert_eq!(day_of_week(2026, 3, 7), Some(6));
        assert_eq!(day_of_week(2024, 2, 29), Some(4));
        assert_eq!(day_of_week(2026, 2, 29), None);
    }

    #[test]
    fn test_diff_days_ignores_time_of_day() {
        let late = Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 3, 11, 0, 1, 0).unwrap();
        assert_eq!(diff_days_between(early, late), 1);
        assert_eq!(diff_days_between(late, early), -1);

        let morning = Utc.with_ymd_and_hms(2026, 3, 10, 6, 0, 0).unwrap();
        assert_eq!(diff_days_between(late, morning), 0);
    }

    #[test]
    fn test_date_only_diff_across_month_and_year() {
        assert_eq!(date_only_diff_days(date(2026, 3, 9), date(2026, 3, 7)), 2);
        assert_eq!(date_only_diff_days(date(2027, 1, 1), date(2026, 12, 31)), 1);
        assert_eq!(date_only_diff_days(date(2026, 1, 1), date(2026, 1, 1)), 0);
    }

    #[test]
    fn test_shift_month() {
        assert_eq!(shift_month(2026, 1, -1), (2025, 12));
        assert_eq!(shift_month(2026, 12, 1), (2027, 1));
        assert_eq!(shift_month(2026, 3, -14), (2025, 1));
        assert_eq!(shift_month(2026, 6, 0), (2026, 6));
    }

    #[test]
    fn test_month_key_round_trip() {
        assert_eq!(month_key(2026, 3), "2026-03");
        assert_eq!(parse_month_key("2026-03"), Some((2026, 3)));
        assert_eq!(parse_month_key("2026-13"), None);
        assert_eq!(parse_month_key("March"), None);
    }
}
