//! Calendar month keys.
//!
//! Every dataset in factorlab is sampled on a different calendar: Yahoo quotes
//! on trading days, Ken French files on `YYYYMM` stamps, FRED on the first of
//! the month. Truncating timestamps to a [`Month`] is the single alignment rule
//! used to join them.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month (year and 1-based month number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Create a month, returning `None` when `month` is outside `1..=12`.
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Truncate a date to its month.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a Ken French style `YYYYMM` stamp (surrounding whitespace allowed).
    pub fn parse_yyyymm(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = s[..4].parse().ok()?;
        let month = s[4..].parse().ok()?;
        Self::new(year, month)
    }

    /// Parse `YYYY-MM` or any ISO date beginning with `YYYY-MM-DD`.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() >= 10
            && let Ok(date) = NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d")
        {
            return Some(Self::from_date(date));
        }
        let (year, month) = s.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    /// Year component.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12).
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Dense integer key, `year * 12 + month - 1`, used as the join column.
    pub const fn key(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }

    /// Inverse of [`Month::key`].
    pub const fn from_key(key: i32) -> Self {
        Self {
            year: key.div_euclid(12),
            month: key.rem_euclid(12) as u32 + 1,
        }
    }

    /// First calendar day of the month.
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month (month-end alignment).
    pub fn end_date(&self) -> NaiveDate {
        self.succ()
            .start_date()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    /// The following month.
    pub const fn succ(&self) -> Self {
        Self::from_key(self.key() + 1)
    }

    /// The preceding month.
    pub const fn pred(&self) -> Self {
        Self::from_key(self.key() - 1)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}
