//! Week-of-month arithmetic.
//!
//! There is more than one reasonable definition of "week of month". This module
//! implements exactly one:
//!
//! - weeks run Monday through Sunday;
//! - week 1 starts on the Monday on or before the 1st of the month;
//! - when the 1st falls on a Saturday or Sunday, week 1 instead starts on that
//!   weekend's Saturday, so the following Monday still belongs to week 1;
//! - the result is never below 1.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Week of the month (1-based) for `date`.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_day = date.with_day(1).unwrap_or(date);
    let first_weekday = first_day.weekday().num_days_from_monday() as i64;

    let first_week_start = if first_weekday >= 5 {
        // Saturday or Sunday: anchor week 1 on the Saturday.
        first_day - Duration::days(first_weekday - 5)
    } else {
        first_day - Duration::days(first_weekday)
    };

    let current_week_start =
        date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let days = (current_week_start - first_week_start).num_days();
    let week = days.div_euclid(7) + 1;
    week.max(1) as u32
}

/// Week of the month for the calendar date of `datetime`.
pub fn week_of_month_datetime(datetime: NaiveDateTime) -> u32 {
    week_of_month(datetime.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_starting_on_monday() {
        // 2024-01-01 is a Monday.
        assert_eq!(week_of_month(d(2024, 1, 1)), 1);
        assert_eq!(week_of_month(d(2024, 1, 7)), 1);
        assert_eq!(week_of_month(d(2024, 1, 8)), 2);
        assert_eq!(week_of_month(d(2024, 1, 31)), 5);
    }

    #[test]
    fn month_starting_midweek() {
        // 2024-05-01 is a Wednesday; its week began Monday 2024-04-29.
        assert_eq!(week_of_month(d(2024, 5, 1)), 1);
        assert_eq!(week_of_month(d(2024, 5, 5)), 1);
        assert_eq!(week_of_month(d(2024, 5, 6)), 2);
    }

    #[test]
    fn month_starting_on_saturday() {
        // 2024-06-01 is a Saturday.
        assert_eq!(week_of_month(d(2024, 6, 1)), 1);
        assert_eq!(week_of_month(d(2024, 6, 2)), 1);
        assert_eq!(week_of_month(d(2024, 6, 3)), 1);
        assert_eq!(week_of_month(d(2024, 6, 9)), 1);
        assert_eq!(week_of_month(d(2024, 6, 10)), 2);
    }

    #[test]
    fn month_starting_on_sunday() {
        // 2024-09-01 is a Sunday.
        assert_eq!(week_of_month(d(2024, 9, 1)), 1);
        assert_eq!(week_of_month(d(2024, 9, 2)), 1);
        assert_eq!(week_of_month(d(2024, 9, 9)), 2);
    }

    #[test]
    fn never_below_one() {
        for day in 1..=30 {
            assert!(week_of_month(d(2024, 11, day)) >= 1);
        }
    }

    #[test]
    fn datetime_uses_calendar_date() {
        let dt = d(2024, 1, 8).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(week_of_month_datetime(dt), 2);
    }
}
