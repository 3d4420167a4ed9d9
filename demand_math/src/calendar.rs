//! Calendar-derived features
//!
//! Turns a calendar day into the integer features a demand model sees:
//! day of week, ISO week, month and year.

use crate::{MathError, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar features for a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Day of week, Monday = 0 through Sunday = 6
    pub day_of_week: u32,
    /// ISO 8601 week number (1-53)
    pub week: u32,
    /// Month (1-12)
    pub month: u32,
    /// Calendar year
    pub year: i32,
}

impl CalendarFeatures {
    /// Derive the calendar features of `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day_of_week: date.weekday().num_days_from_monday(),
            week: date.iso_week().week(),
            month: date.month(),
            year: date.year(),
        }
    }

    /// Whether the day falls on Saturday or Sunday
    pub fn is_weekend(&self) -> bool {
        self.day_of_week >= 5
    }
}

impl From<NaiveDate> for CalendarFeatures {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

/// The calendar day after `date`
pub fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| MathError::CalendarError(format!("No calendar day after {}", date)))
}

/// `periods` consecutive days starting at `start` (inclusive)
pub fn date_range(start: NaiveDate, periods: usize) -> Result<Vec<NaiveDate>> {
    (0..periods)
        .map(|offset| {
            start.checked_add_days(Days::new(offset as u64)).ok_or_else(|| {
                MathError::CalendarError(format!(
                    "Date range from {} overflows after {} days",
                    start, offset
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(ymd(2021, 1, 1), 4, 53, 1, 2021)] // Friday, still ISO week 53 of 2020
    #[case(ymd(2021, 1, 4), 0, 1, 1, 2021)] // Monday of ISO week 1
    #[case(ymd(2022, 12, 31), 5, 52, 12, 2022)]
    #[case(ymd(2024, 2, 29), 3, 9, 2, 2024)]
    #[case(ymd(2024, 12, 30), 0, 1, 12, 2024)] // ISO week 1 of 2025
    fn test_calendar_features(
        #[case] date: NaiveDate,
        #[case] day_of_week: u32,
        #[case] week: u32,
        #[case] month: u32,
        #[case] year: i32,
    ) {
        let features = CalendarFeatures::from_date(date);
        assert_eq!(features.day_of_week, day_of_week);
        assert_eq!(features.week, week);
        assert_eq!(features.month, month);
        assert_eq!(features.year, year);
    }

    #[test]
    fn test_weekend() {
        assert!(CalendarFeatures::from(ymd(2023, 1, 1)).is_weekend());
        assert!(!CalendarFeatures::from(ymd(2023, 1, 2)).is_weekend());
    }

    #[test]
    fn test_next_day_crosses_year() {
        assert_eq!(next_day(ymd(2021, 12, 31)).unwrap(), ymd(2022, 1, 1));
        assert!(next_day(NaiveDate::MAX).is_err());
    }

    #[test]
    fn test_date_range() {
        let dates = date_range(ymd(2024, 2, 27), 4).unwrap();
        assert_eq!(
            dates,
            vec![ymd(2024, 2, 27), ymd(2024, 2, 28), ymd(2024, 2, 29), ymd(2024, 3, 1)]
        );
        assert!(date_range(ymd(2024, 1, 1), 0).unwrap().is_empty());
    }
}
