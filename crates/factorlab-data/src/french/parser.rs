//! Parser for the monthly section of a Ken French CSV file.

use crate::error::{DataError, Result};
use crate::month::Month;
use crate::panel::MonthlyPanel;
use crate::series::MonthlySeries;
use tracing::debug;

/// Values at or below this are the library's missing-data sentinels
/// (`-99.99` and `-999`).
const MISSING_SENTINEL: f64 = -99.99;

/// Monthly factor returns parsed from a Ken French file, in decimal units.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    months: Vec<Month>,
    columns: Vec<String>,
    /// Column-major values; `None` marks a missing cell.
    values: Vec<Vec<Option<f64>>>,
}

impl FactorTable {
    fn with_columns(columns: &[&str]) -> Self {
        Self {
            months: Vec::new(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            values: vec![Vec::new(); columns.len()],
        }
    }

    fn push_row(&mut self, month: Month, cells: &[&str]) {
        self.months.push(month);
        for (i, column) in self.values.iter_mut().enumerate() {
            column.push(cells.get(i).and_then(|c| parse_percent(c)));
        }
    }

    /// Months in file order.
    pub fn months(&self) -> &[Month] {
        &self.months
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of monthly rows.
    pub fn len(&self) -> usize {
        self.months.len()
    }

    /// Whether no monthly rows were parsed.
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Raw values of a column, `None` where missing.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[idx])
    }

    /// A column as a series; missing cells are skipped.
    pub fn series(&self, name: &str) -> Result<MonthlySeries> {
        let values = self
            .column(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?;
        Ok(MonthlySeries::from_pairs(
            name,
            self.months
                .iter()
                .zip(values)
                .filter_map(|(m, v)| v.map(|v| (*m, v))),
        ))
    }

    /// Drop rows with any missing value.
    pub fn complete_rows(&self) -> Self {
        let keep: Vec<bool> = (0..self.len())
            .map(|i| self.values.iter().all(|c| c[i].is_some()))
            .collect();
        Self {
            months: self
                .months
                .iter()
                .zip(&keep)
                .filter_map(|(m, k)| k.then_some(*m))
                .collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|c| c.iter().zip(&keep).filter_map(|(v, k)| k.then_some(*v)).collect())
                .collect(),
        }
    }

    /// Convert to a month-keyed panel.
    pub fn to_panel(&self) -> Result<MonthlyPanel> {
        MonthlyPanel::from_columns(
            &self.months,
            self.columns
                .iter()
                .cloned()
                .zip(self.values.iter().cloned())
                .collect(),
        )
    }
}

/// Split a CSV line into trimmed fields.
pub(crate) fn fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Month stamp of a data row, if the first field is `YYYYMM`.
pub(crate) fn row_month(parts: &[&str]) -> Option<Month> {
    parts.first().and_then(|p| Month::parse_yyyymm(p))
}

/// Parse a percentage cell into a decimal return.
pub(crate) fn parse_percent(cell: &str) -> Option<f64> {
    let value: f64 = cell.trim().parse().ok()?;
    (value.is_finite() && value > MISSING_SENTINEL).then_some(value / 100.0)
}

/// Parse the first monthly section of a Ken French CSV.
///
/// Data starts at the first line whose leading field is a `YYYYMM` stamp and
/// ends at the first following non-blank line that is not a monthly row, so
/// annual sections and footers are never read. Cells after the date map to
/// `columns` in order; missing or malformed cells become `None`.
pub fn parse_factor_table(text: &str, columns: &[&str]) -> Result<FactorTable> {
    let mut table = FactorTable::with_columns(columns);
    let mut started = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts = fields(line);
        match row_month(&parts) {
            Some(month) => {
                started = true;
                table.push_row(month, &parts[1..]);
            }
            None if started => break,
            None => {}
        }
    }

    if table.is_empty() {
        return Err(DataError::Parse(
            "no monthly rows found in Ken French file".to_string(),
        ));
    }
    debug!(
        rows = table.len(),
        first = %table.months[0],
        last = %table.months[table.len() - 1],
        "parsed factor table"
    );
    Ok(table)
}
