//! Monthly time series.

use crate::month::Month;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// A named series of finite values keyed by calendar month.
///
/// Non-finite values are rejected on insertion, so every value in a series can
/// be fed straight into a regression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonthlySeries {
    name: String,
    points: BTreeMap<Month, f64>,
}

impl MonthlySeries {
    /// Create an empty series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: BTreeMap::new(),
        }
    }

    /// Build a series from `(month, value)` pairs. Later duplicates win and
    /// non-finite values are skipped.
    pub fn from_pairs(name: impl Into<String>, pairs: impl IntoIterator<Item = (Month, f64)>) -> Self {
        let mut series = Self::new(name);
        for (month, value) in pairs {
            series.insert(month, value);
        }
        series
    }

    /// Resample daily observations to month end, keeping the last observation
    /// of each month.
    pub fn from_daily_last(name: impl Into<String>, observations: &[(NaiveDate, f64)]) -> Self {
        let mut sorted: Vec<_> = observations
            .iter()
            .filter(|(_, v)| v.is_finite())
            .copied()
            .collect();
        sorted.sort_by_key(|(date, _)| *date);
        Self::from_pairs(
            name,
            sorted
                .into_iter()
                .map(|(date, value)| (Month::from_date(date), value)),
        )
    }

    /// Compound daily returns into monthly returns: `prod(1 + r) - 1`.
    pub fn compound_daily(name: impl Into<String>, returns: &[(NaiveDate, f64)]) -> Self {
        let mut growth: BTreeMap<Month, f64> = BTreeMap::new();
        for (date, r) in returns.iter().filter(|(_, r)| r.is_finite()) {
            *growth.entry(Month::from_date(*date)).or_insert(1.0) *= 1.0 + r;
        }
        Self::from_pairs(name, growth.into_iter().map(|(m, g)| (m, g - 1.0)))
    }

    /// Insert a value, ignoring non-finite input. Returns whether it was stored.
    pub fn insert(&mut self, month: Month, value: f64) -> bool {
        if value.is_finite() {
            self.points.insert(month, value);
            true
        } else {
            false
        }
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the same data under a new name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Value for a month.
    pub fn get(&self, month: Month) -> Option<f64> {
        self.points.get(&month).copied()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Earliest month.
    pub fn first_month(&self) -> Option<Month> {
        self.points.keys().next().copied()
    }

    /// Latest month.
    pub fn last_month(&self) -> Option<Month> {
        self.points.keys().next_back().copied()
    }

    /// Months in ascending order.
    pub fn months(&self) -> Vec<Month> {
        self.points.keys().copied().collect()
    }

    /// Values in month order.
    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    /// Iterate `(month, value)` in month order.
    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        self.points.iter().map(|(m, v)| (*m, *v))
    }

    /// Simple return between consecutive observations. The first observation
    /// and any non-finite ratio (e.g. division by zero) are dropped.
    pub fn pct_change(&self) -> Self {
        self.pairwise(|prev, cur| cur / prev - 1.0)
    }

    /// Difference between consecutive observations.
    pub fn diff(&self) -> Self {
        self.pairwise(|prev, cur| cur - prev)
    }

    fn pairwise(&self, f: impl Fn(f64, f64) -> f64) -> Self {
        let values: Vec<_> = self.iter().collect();
        Self::from_pairs(
            self.name.clone(),
            values
                .windows(2)
                .map(|w| (w[1].0, f(w[0].1, w[1].1))),
        )
    }

    /// Multiply every value by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        Self::from_pairs(self.name.clone(), self.iter().map(|(m, v)| (m, v * factor)))
    }

    /// Keep only values inside `[min, max]`.
    pub fn clamp_filter(&self, min: f64, max: f64) -> Self {
        Self::from_pairs(
            self.name.clone(),
            self.iter().filter(|(_, v)| *v >= min && *v <= max),
        )
    }

    /// Keep months on or after `start`.
    pub fn since(&self, start: Month) -> Self {
        Self::from_pairs(self.name.clone(), self.points.range(start..).map(|(m, v)| (*m, *v)))
    }

    /// Pointwise combination on the months both series share.
    pub fn zip_with(&self, other: &Self, name: impl Into<String>, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::from_pairs(
            name,
            self.iter()
                .filter_map(|(m, a)| other.get(m).map(|b| (m, f(a, b)))),
        )
    }

    /// `self - other` on shared months.
    pub fn minus(&self, other: &Self, name: impl Into<String>) -> Self {
        self.zip_with(other, name, |a, b| a - b)
    }
}
