//! Statement lookback windows.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    /// Calendar year
    pub year: i32,
    /// Month, 1-12
    pub month: u32,
}

impl YearMonth {
    /// Month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month before this one.
    #[must_use]
    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Parse `YYYY-MM`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (year, month) = text.split_once('-')?;
        let ym = Self {
            year: year.parse().ok()?,
            month: month.parse().ok()?,
        };
        ym.first_day().map(|_| ym)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The `count` months ending with the month of `today`, newest first.
#[must_use]
pub fn recent_months(today: NaiveDate, count: u32) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = YearMonth::of(today);
    for _ in 0..count {
        months.push(current);
        current = current.previous();
    }
    months
}

/// The `count` years ending with the year of `today`, newest first.
#[must_use]
pub fn recent_years(today: NaiveDate, count: u32) -> Vec<i32> {
    (0..count)
        .filter_map(|offset| i32::try_from(offset).ok())
        .map(|offset| today.year() - offset)
        .collect()
}

/// Earliest date inside a `months`-long window ending at `today`.
#[must_use]
pub fn window_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(chrono::Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
