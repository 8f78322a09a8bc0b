//! Calendar day collaborator.
//!
//! All "what day is it" queries go through [`DateProvider`] so the accounting
//! engine and stats can be driven with arbitrary days in tests. Days are
//! epoch day indices, where day 0 is 1970-01-01.

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Supplies the current calendar day to the accounting engine and stats.
pub trait DateProvider {
    /// Today's epoch day, where day 0 is 1970-01-01.
    fn today(&self) -> i64;

    /// Day of the month, from 1 to 31.
    fn day_of_month(&self) -> u32;

    /// Day of the year, from 1 to 366.
    fn day_of_year(&self) -> u32;
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("1970-01-01 is a valid date")
}

/// Epoch day index for a civil date.
pub fn unix_day(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

/// Civil date for an epoch day index. Returns None for days outside the
/// representable range (the sentinel day -1 maps to 1969-12-31, which is
/// valid but never displayed).
pub fn day_to_date(day: i64) -> Option<NaiveDate> {
    epoch().checked_add_signed(Duration::days(day))
}

/// Date provider backed by the system clock, local timezone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemDate;

impl DateProvider for SystemDate {
    fn today(&self) -> i64 {
        unix_day(Local::now().date_naive())
    }

    fn day_of_month(&self) -> u32 {
        Local::now().day()
    }

    fn day_of_year(&self) -> u32 {
        Local::now().ordinal()
    }
}

/// Date provider pinned to a fixed day, for deterministic tests and tooling.
#[derive(Clone, Copy, Debug)]
pub struct FixedDate {
    pub day: i64,
    pub day_of_month: u32,
    pub day_of_year: u32,
}

impl FixedDate {
    /// Fixed provider for a civil date.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            day: unix_day(date),
            day_of_month: date.day(),
            day_of_year: date.ordinal(),
        }
    }
}

impl DateProvider for FixedDate {
    fn today(&self) -> i64 {
        self.day
    }

    fn day_of_month(&self) -> u32 {
        self.day_of_month
    }

    fn day_of_year(&self) -> u32 {
        self.day_of_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_day_oct_24_2021() {
        let date = NaiveDate::from_ymd_opt(2021, 10, 24).unwrap();
        assert_eq!(unix_day(date), 18924);
    }

    #[test]
    fn test_unix_day_epoch_is_zero() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(unix_day(date), 0);
    }

    #[test]
    fn test_day_to_date_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2021, 10, 24).unwrap();
        assert_eq!(day_to_date(unix_day(date)), Some(date));
    }

    #[test]
    fn test_fixed_date_for_date() {
        let date = NaiveDate::from_ymd_opt(2021, 10, 24).unwrap();
        let fixed = FixedDate::for_date(date);
        assert_eq!(fixed.today(), 18924);
        assert_eq!(fixed.day_of_month(), 24);
        assert_eq!(fixed.day_of_year(), 297);
    }
}
