//! Month-aligned panels of named series.
//!
//! A [`MonthlyPanel`] is a polars `DataFrame` with an `Int32` month key column
//! (see [`Month::key`]) and any number of `Float64` value columns. Panels are
//! joined on the month key only, which is how series with different native
//! calendars are lined up before a regression.

use crate::error::{DataError, Result};
use crate::french::FactorTable;
use crate::month::Month;
use crate::series::MonthlySeries;
use polars::prelude::*;

/// Name of the month key column.
pub const MONTH_COLUMN: &str = "month";

/// How two panels are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Months present in both panels.
    Inner,
    /// All months of the left panel.
    Left,
    /// Months present in either panel.
    Outer,
}

impl JoinKind {
    fn args(self) -> JoinArgs {
        match self {
            Self::Inner => JoinArgs::new(JoinType::Inner),
            Self::Left => JoinArgs::new(JoinType::Left),
            Self::Outer => {
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns)
            }
        }
    }
}

/// A set of monthly series sharing one month index.
#[derive(Debug, Clone)]
pub struct MonthlyPanel {
    df: DataFrame,
}

impl MonthlyPanel {
    /// Build a panel from a month index and equally long value columns.
    /// Non-finite values are stored as nulls.
    pub fn from_columns(months: &[Month], columns: Vec<(String, Vec<Option<f64>>)>) -> Result<Self> {
        let keys: Vec<i32> = months.iter().map(Month::key).collect();
        let mut cols: Vec<Column> = vec![Series::new(MONTH_COLUMN.into(), keys).into()];

        for (name, values) in columns {
            if name == MONTH_COLUMN {
                return Err(DataError::DuplicateColumn(name));
            }
            if values.len() != months.len() {
                return Err(DataError::Parse(format!(
                    "column {} has {} values for {} months",
                    name,
                    values.len(),
                    months.len()
                )));
            }
            let values: Vec<Option<f64>> = values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            cols.push(Series::new(name.as_str().into(), values).into());
        }

        Self::sorted(DataFrame::new(cols)?)
    }

    /// Single-column panel from a series.
    pub fn from_series(series: &MonthlySeries) -> Result<Self> {
        let months = series.months();
        let values = series.values().into_iter().map(Some).collect();
        Self::from_columns(&months, vec![(series.name().to_string(), values)])
    }

    /// Panel holding every column of a parsed Ken French table.
    pub fn from_table(table: &FactorTable) -> Result<Self> {
        table.to_panel()
    }

    /// Align several series with the given join, left to right.
    pub fn align(series: &[&MonthlySeries], kind: JoinKind) -> Result<Self> {
        let (first, rest) = series.split_first().ok_or_else(|| DataError::MissingData {
            symbol: "panel".to_string(),
            reason: "no series to align".to_string(),
        })?;
        let mut panel = Self::from_series(first)?;
        for s in rest {
            panel = panel.join(&Self::from_series(s)?, kind)?;
        }
        Ok(panel)
    }

    fn sorted(df: DataFrame) -> Result<Self> {
        let df = df
            .lazy()
            .sort([MONTH_COLUMN], SortMultipleOptions::default())
            .collect()?;
        Ok(Self { df })
    }

    /// Join with another panel on the month key.
    ///
    /// # Errors
    /// Returns [`DataError::DuplicateColumn`] when both panels carry a value
    /// column with the same name.
    pub fn join(&self, other: &Self, kind: JoinKind) -> Result<Self> {
        for name in other.columns() {
            if self.has_column(&name) {
                return Err(DataError::DuplicateColumn(name));
            }
        }

        let df = self
            .df
            .clone()
            .lazy()
            .join(
                other.df.clone().lazy(),
                [col(MONTH_COLUMN)],
                [col(MONTH_COLUMN)],
                kind.args(),
            )
            .sort([MONTH_COLUMN], SortMultipleOptions::default())
            .collect()?;

        Ok(Self { df })
    }

    /// Join with a single series.
    pub fn join_series(&self, series: &MonthlySeries, kind: JoinKind) -> Result<Self> {
        self.join(&Self::from_series(series)?, kind)
    }

    /// Value column names (the month key excluded), in frame order.
    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|c| c.as_str().to_string())
            .filter(|c| c != MONTH_COLUMN)
            .collect()
    }

    /// Whether a value column exists.
    pub fn has_column(&self, name: &str) -> bool {
        name != MONTH_COLUMN && self.df.get_column_names().iter().any(|c| c.as_str() == name)
    }

    fn require(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(DataError::ColumnNotFound(name.to_string()))
        }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Month index in ascending order.
    pub fn months(&self) -> Result<Vec<Month>> {
        let keys = self.df.column(MONTH_COLUMN)?.i32()?;
        Ok(keys.into_iter().flatten().map(Month::from_key).collect())
    }

    /// First month of the index.
    pub fn first_month(&self) -> Result<Option<Month>> {
        Ok(self.months()?.first().copied())
    }

    /// Last month of the index.
    pub fn last_month(&self) -> Result<Option<Month>> {
        Ok(self.months()?.last().copied())
    }

    /// Values of a column, which must not contain nulls.
    pub fn column_values(&self, name: &str) -> Result<Vec<f64>> {
        self.require(name)?;
        let ca = self.df.column(name)?.f64()?;
        ca.into_iter()
            .map(|v| {
                v.ok_or_else(|| DataError::MissingData {
                    symbol: name.to_string(),
                    reason: "null value in aligned panel".to_string(),
                })
            })
            .collect()
    }

    /// Values of a column with nulls preserved.
    pub fn optional_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.require(name)?;
        let ca = self.df.column(name)?.f64()?;
        Ok(ca.into_iter().collect())
    }

    /// Column as a series (nulls skipped).
    pub fn series(&self, name: &str) -> Result<MonthlySeries> {
        let months = self.months()?;
        let values = self.optional_values(name)?;
        Ok(MonthlySeries::from_pairs(
            name,
            months
                .into_iter()
                .zip(values)
                .filter_map(|(m, v)| v.map(|v| (m, v))),
        ))
    }

    /// Number of non-null values in a column.
    pub fn non_null_count(&self, name: &str) -> Result<usize> {
        self.require(name)?;
        let column = self.df.column(name)?;
        Ok(self.df.height() - column.null_count())
    }

    /// Keep only rows where every listed column is non-null.
    pub fn drop_nulls(&self, columns: &[&str]) -> Result<Self> {
        let mut predicate = lit(true);
        for name in columns {
            self.require(name)?;
            predicate = predicate.and(col(*name).is_not_null());
        }
        let df = self.df.clone().lazy().filter(predicate).collect()?;
        Ok(Self { df })
    }

    /// Keep only rows where every value column is non-null.
    pub fn drop_all_nulls(&self) -> Result<Self> {
        let columns = self.columns();
        let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        self.drop_nulls(&refs)
    }

    /// Keep the month column plus the listed value columns.
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        for name in columns {
            self.require(name)?;
        }
        let selection = std::iter::once(MONTH_COLUMN.to_string())
            .chain(columns.iter().map(|c| (*c).to_string()));
        Ok(Self {
            df: self.df.select(selection)?,
        })
    }

    /// Add `name = a - b`.
    pub fn with_difference(&self, name: &str, a: &str, b: &str) -> Result<Self> {
        self.with_linear_combination(name, &[(a, 1.0), (b, -1.0)])
    }

    /// Add `name = sum(weight * column)`.
    pub fn with_linear_combination(&self, name: &str, terms: &[(&str, f64)]) -> Result<Self> {
        if self.has_column(name) || name == MONTH_COLUMN {
            return Err(DataError::DuplicateColumn(name.to_string()));
        }
        let mut expr = lit(0.0);
        for (column, weight) in terms {
            self.require(column)?;
            expr = expr + col(*column) * lit(*weight);
        }
        let df = self
            .df
            .clone()
            .lazy()
            .with_column(expr.alias(name))
            .collect()?;
        Ok(Self { df })
    }

    /// Rename a value column.
    pub fn rename(&self, from: &str, to: &str) -> Result<Self> {
        self.require(from)?;
        if self.has_column(to) {
            return Err(DataError::DuplicateColumn(to.to_string()));
        }
        let mut df = self.df.clone();
        df.rename(from, to.into())?;
        Ok(Self { df })
    }

    /// Keep rows with `start <= month <= end` (either bound optional).
    pub fn between(&self, start: Option<Month>, end: Option<Month>) -> Result<Self> {
        let mut predicate = lit(true);
        if let Some(start) = start {
            predicate = predicate.and(col(MONTH_COLUMN).gt_eq(lit(start.key())));
        }
        if let Some(end) = end {
            predicate = predicate.and(col(MONTH_COLUMN).lt_eq(lit(end.key())));
        }
        let df = self.df.clone().lazy().filter(predicate).collect()?;
        Ok(Self { df })
    }

    /// Keep rows whose month satisfies `keep`.
    pub fn filter_months(&self, keep: impl Fn(Month) -> bool) -> Result<Self> {
        let mask: Vec<bool> = self.months()?.into_iter().map(keep).collect();
        let mask = BooleanChunked::from_slice("mask".into(), &mask);
        Ok(Self {
            df: self.df.filter(&mask)?,
        })
    }

    /// Keep rows whose month appears in `months`.
    pub fn restrict_to(&self, months: &[Month]) -> Result<Self> {
        let keys: Vec<i32> = months.iter().map(Month::key).collect();
        let index = DataFrame::new(vec![Series::new(MONTH_COLUMN.into(), keys).into()])?;
        let df = self
            .df
            .clone()
            .lazy()
            .join(
                index.lazy(),
                [col(MONTH_COLUMN)],
                [col(MONTH_COLUMN)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort([MONTH_COLUMN], SortMultipleOptions::default())
            .collect()?;
        Ok(Self { df })
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            df: self.df.head(Some(n)),
        }
    }

    /// Rows as `(month, values)` with values ordered like [`MonthlyPanel::columns`].
    pub fn rows(&self) -> Result<Vec<(Month, Vec<Option<f64>>)>> {
        let months = self.months()?;
        let columns = self
            .columns()
            .iter()
            .map(|c| self.optional_values(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(months
            .into_iter()
            .enumerate()
            .map(|(i, m)| (m, columns.iter().map(|c| c[i]).collect()))
            .collect())
    }

    /// Borrow the underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.df
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn m(y: i32, mo: u32) -> Month {
        Month::new(y, mo).unwrap()
    }

    fn series(name: &str, points: &[(Month, f64)]) -> MonthlySeries {
        MonthlySeries::from_pairs(name, points.iter().copied())
    }

    #[test]
    fn inner_join_keeps_shared_months_sorted() {
        let a = series("SPMO", &[(m(2020, 3), 0.03), (m(2020, 1), 0.01), (m(2020, 2), 0.02)]);
        let b = series("UMD", &[(m(2020, 2), -0.01), (m(2020, 3), 0.04), (m(2020, 4), 0.05)]);
        let panel = MonthlyPanel::align(&[&a, &b], JoinKind::Inner).unwrap();

        assert_eq!(panel.months().unwrap(), vec![m(2020, 2), m(2020, 3)]);
        assert_eq!(panel.column_values("SPMO").unwrap(), vec![0.02, 0.03]);
        assert_eq!(panel.column_values("UMD").unwrap(), vec![-0.01, 0.04]);
        assert_eq!(panel.columns(), vec!["SPMO".to_string(), "UMD".to_string()]);
    }

    #[test]
    fn outer_join_keeps_all_months() {
        let a = series("usd_ret", &[(m(2020, 1), 0.01), (m(2020, 2), 0.02)]);
        let b = series("dgs10_chg", &[(m(2020, 2), 0.001), (m(2020, 3), 0.002)]);
        let panel = MonthlyPanel::align(&[&a, &b], JoinKind::Outer).unwrap();

        assert_eq!(panel.months().unwrap(), vec![m(2020, 1), m(2020, 2), m(2020, 3)]);
        assert_eq!(
            panel.optional_values("usd_ret").unwrap(),
            vec![Some(0.01), Some(0.02), None]
        );
        assert_eq!(panel.non_null_count("dgs10_chg").unwrap(), 2);
        assert!(panel.column_values("usd_ret").is_err());
        assert_eq!(panel.drop_all_nulls().unwrap().height(), 1);
    }

    #[test]
    fn left_join_keeps_left_months() {
        let a = series("fund_ret", &[(m(2020, 1), 0.01), (m(2020, 2), 0.02)]);
        let b = series("usd_ret", &[(m(2020, 2), 0.5)]);
        let panel = MonthlyPanel::align(&[&a, &b], JoinKind::Left).unwrap();
        assert_eq!(panel.height(), 2);
        assert_eq!(panel.optional_values("usd_ret").unwrap(), vec![None, Some(0.5)]);
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let a = series("RF", &[(m(2020, 1), 0.001)]);
        let b = series("RF", &[(m(2020, 1), 0.001)]);
        let err = MonthlyPanel::align(&[&a, &b], JoinKind::Inner).unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn(ref c) if c == "RF"));
    }

    #[test]
    fn derived_columns() {
        let months = vec![m(2021, 1), m(2021, 2)];
        let panel = MonthlyPanel::from_columns(
            &months,
            vec![
                ("hml".to_string(), vec![Some(0.01), Some(0.02)]),
                ("rmw".to_string(), vec![Some(0.03), Some(0.01)]),
                ("cma".to_string(), vec![Some(0.005), Some(f64::NAN)]),
            ],
        )
        .unwrap();

        let spread = panel
            .with_linear_combination("equity_style_spread", &[("hml", 1.0), ("rmw", 1.0), ("cma", -1.0)])
            .unwrap();
        let values = spread.optional_values("equity_style_spread").unwrap();
        assert_relative_eq!(values[0].unwrap(), 0.035, epsilon = 1e-12);
        // NaN input is stored as null and propagates
        assert_eq!(values[1], None);

        let diff = panel.with_difference("hml_minus_rmw", "hml", "rmw").unwrap();
        assert_relative_eq!(
            diff.column_values("hml_minus_rmw").unwrap()[1],
            0.01,
            epsilon = 1e-12
        );
    }

    #[test]
    fn between_and_restrict() {
        let s = series(
            "x",
            &[(m(2020, 1), 1.0), (m(2020, 2), 2.0), (m(2020, 3), 3.0), (m(2020, 4), 4.0)],
        );
        let panel = MonthlyPanel::from_series(&s).unwrap();
        let cut = panel.between(Some(m(2020, 2)), Some(m(2020, 3))).unwrap();
        assert_eq!(cut.column_values("x").unwrap(), vec![2.0, 3.0]);

        let restricted = panel.restrict_to(&[m(2020, 4), m(2020, 1), m(2021, 1)]).unwrap();
        assert_eq!(restricted.column_values("x").unwrap(), vec![1.0, 4.0]);

        let even = panel.filter_months(|mo| mo.month() % 2 == 0).unwrap();
        assert_eq!(even.column_values("x").unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn select_rename_and_rows() {
        let a = series("a", &[(m(2020, 1), 1.0)]);
        let b = series("b", &[(m(2020, 1), 2.0)]);
        let panel = MonthlyPanel::align(&[&a, &b], JoinKind::Inner).unwrap();
        let only_b = panel.select(&["b"]).unwrap().rename("b", "B").unwrap();
        assert_eq!(only_b.columns(), vec!["B".to_string()]);
        assert_eq!(only_b.rows().unwrap(), vec![(m(2020, 1), vec![Some(2.0)])]);
        assert!(matches!(panel.select(&["zzz"]), Err(DataError::ColumnNotFound(_))));
    }
}
