//! Tabular results.
//!
//! Every study artefact (summary metrics, coefficient tables, model
//! comparisons) is a [`Table`]: named columns of [`Cell`]s that can be written
//! to CSV, read back by the report builders, and rendered as Markdown or as a
//! fixed-width console table.

use crate::error::{OutputError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Free text.
    Text(String),
    /// Floating point value. Non-finite values render as missing.
    Number(f64),
    /// Whole number such as an observation count.
    Integer(i64),
    /// Missing value.
    Missing,
}

impl Cell {
    /// Parse a CSV field: empty is missing, integers and floats are numeric,
    /// anything else is text.
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        if field.is_empty() || field.eq_ignore_ascii_case("nan") {
            return Self::Missing;
        }
        if let Ok(i) = field.parse::<i64>() {
            return Self::Integer(i);
        }
        match field.parse::<f64>() {
            Ok(x) if x.is_finite() => Self::Number(x),
            _ => Self::Text(field.to_string()),
        }
    }

    /// Numeric value, if the cell holds one.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(x) if x.is_finite() => Some(*x),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Whether the cell is missing (or a non-finite number).
    pub const fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(x) => !x.is_finite(),
            _ => false,
        }
    }

    /// Render with `digits` decimals for floats; missing cells are blank.
    pub fn format(&self, digits: usize) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(x) if x.is_finite() => format!("{x:.digits$}"),
            Self::Integer(i) => i.to_string(),
            Self::Number(_) | Self::Missing => String::new(),
        }
    }

    /// Render at full precision, as written to CSV.
    pub fn to_field(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(x) if x.is_finite() => x.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Number(_) | Self::Missing => String::new(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(x) if x.is_finite() => serializer.serialize_f64(*x),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Number(_) | Self::Missing => serializer.serialize_none(),
        }
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl From<Option<f64>> for Cell {
    fn from(x: Option<f64>) -> Self {
        x.map_or(Self::Missing, Self::Number)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or(Self::Number(n as f64), Self::Integer)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A rectangular table with named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given headers.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a two-column `Metric,Value` table.
    pub fn metrics(rows: impl IntoIterator<Item = (String, Cell)>) -> Self {
        Self {
            headers: vec!["Metric".to_string(), "Value".to_string()],
            rows: rows.into_iter().map(|(k, v)| vec![Cell::Text(k), v]).collect(),
        }
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::RaggedRow`] when the row length differs from
    /// the number of headers.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(OutputError::RaggedRow {
                row: self.rows.len(),
                expected: self.headers.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All cells of a column.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::ColumnNotFound`] for an unknown header.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| OutputError::ColumnNotFound(name.to_string()))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Cell in `value_col` on the first row whose `key_col` text equals `key`.
    pub fn lookup(&self, key_col: &str, key: &str, value_col: &str) -> Option<&Cell> {
        let k = self.column_index(key_col)?;
        let v = self.column_index(value_col)?;
        self.rows
            .iter()
            .find(|row| matches!(&row[k], Cell::Text(s) if s == key))
            .map(|row| &row[v])
    }

    /// Value of a metric in a `Metric,Value` table.
    pub fn metric(&self, key: &str) -> Option<&Cell> {
        self.lookup("Metric", key, "Value")
    }

    /// Keep only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::ColumnNotFound`] for an unknown header.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let idx = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| OutputError::ColumnNotFound((*n).to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            headers: names.iter().map(|n| (*n).to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| idx.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Serialize as CSV with full-precision numbers and blank missing cells.
    ///
    /// # Errors
    ///
    /// Returns an error if CSV serialization fails.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Cell::to_field))?;
        }
        let bytes = wtr.into_inner().map_err(|e| OutputError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| OutputError::InvalidFormat(e.to_string()))
    }

    /// Parse CSV text with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed CSV or ragged rows.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_reader(csv::Reader::from_reader(text.as_bytes()))
    }

    /// Read a CSV file written by [`Table::write_csv`] (or by any tool that
    /// writes a header row).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn read_csv(path: &Path) -> Result<Self> {
        Self::from_csv_reader(csv::Reader::from_path(path)?)
    }

    fn from_csv_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Self> {
        let mut table = Self::new(rdr.headers()?.iter());
        for record in rdr.records() {
            let record = record?;
            table.push_row(record.iter().map(Cell::parse).collect())?;
        }
        Ok(table)
    }

    /// Write the table as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_csv_string()?)?;
        tracing::info!(path = %path.display(), rows = self.len(), "Saved table");
        Ok(())
    }

    /// Render as a GitHub-flavoured Markdown table, formatting floats with
    /// `digits` decimals and leaving missing cells blank.
    pub fn to_markdown(&self, digits: usize) -> String {
        let escape = |s: &str| s.replace('|', "\\|");
        let mut out = String::new();
        out.push_str("| ");
        out.push_str(
            &self
                .headers
                .iter()
                .map(|h| escape(h))
                .collect::<Vec<_>>()
                .join(" | "),
        );
        out.push_str(" |\n|");
        for _ in &self.headers {
            out.push_str("---|");
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str("| ");
            out.push_str(
                &row.iter()
                    .map(|c| escape(&c.format(digits)))
                    .collect::<Vec<_>>()
                    .join(" | "),
            );
            out.push_str(" |\n");
        }
        out
    }

    /// Cells formatted for display, one string per cell.
    pub fn formatted_rows(&self, digits: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.format(digits)).collect())
            .collect()
    }

    /// Fixed-width table for terminal display.
    pub fn to_ascii_table(&self, digits: usize) -> String {
        let body = self.formatted_rows(digits);
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                body.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

        let mut output = String::new();
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (c, w))| {
                    if i == 0 {
                        format!("{c:<w$}")
                    } else {
                        format!("{c:>w$}")
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        };
        output.push_str(line(&self.headers).trim_end());
        output.push('\n');
        output.push_str(&"-".repeat(total));
        output.push('\n');
        for row in &body {
            output.push_str(line(row).trim_end());
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> Table {
        let mut t = Table::new(["Model", "Beta", "T-stat"]);
        t.push_row(vec!["Winners_VW".into(), 0.91234.into(), 12.5.into()])
            .unwrap();
        t.push_row(vec!["UMD_Official".into(), Cell::Number(f64::NAN), Cell::Missing])
            .unwrap();
        t
    }

    #[rstest]
    #[case("", Cell::Missing)]
    #[case("nan", Cell::Missing)]
    #[case("120", Cell::Integer(120))]
    #[case("0.25", Cell::Number(0.25))]
    #[case("-1e-3", Cell::Number(-0.001))]
    #[case("2015-11", Cell::Text("2015-11".to_string()))]
    #[case("Beta (UMD)", Cell::Text("Beta (UMD)".to_string()))]
    fn parse_cells(#[case] field: &str, #[case] expected: Cell) {
        assert_eq!(Cell::parse(field), expected);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut t = Table::new(["a", "b"]);
        let err = t.push_row(vec![Cell::Missing]).unwrap_err();
        assert!(matches!(err, OutputError::RaggedRow { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn markdown_formats_digits_and_blanks_missing() {
        let md = sample().to_markdown(3);
        assert!(md.starts_with("| Model | Beta | T-stat |\n|---|---|---|\n"));
        assert!(md.contains("| Winners_VW | 0.912 | 12.500 |"));
        assert!(md.contains("| UMD_Official |  |  |"));
    }

    #[test]
    fn csv_round_trip_keeps_values() {
        let t = sample();
        let csv = t.to_csv_string().unwrap();
        assert!(csv.starts_with("Model,Beta,T-stat\n"));
        let back = Table::from_csv_str(&csv).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.rows()[0][1], Cell::Number(0.91234));
        assert!(back.rows()[1][1].is_missing());
    }

    #[test]
    fn metric_lookup() {
        let t = Table::metrics(vec![
            ("Beta (UMD)".to_string(), Cell::Number(0.27)),
            ("N".to_string(), Cell::from(118_usize)),
        ]);
        assert_eq!(t.metric("Beta (UMD)").and_then(Cell::as_f64), Some(0.27));
        assert_eq!(t.metric("N"), Some(&Cell::Integer(118)));
        assert!(t.metric("Gamma").is_none());
    }

    #[test]
    fn select_reorders_and_validates() {
        let t = sample().select(&["T-stat", "Model"]).unwrap();
        assert_eq!(t.headers(), ["T-stat", "Model"]);
        assert_eq!(t.rows()[0][1], Cell::from("Winners_VW"));
        assert!(sample().select(&["Nope"]).is_err());
    }

    #[test]
    fn ascii_table_aligns_columns() {
        let ascii = sample().to_ascii_table(2);
        let lines: Vec<_> = ascii.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Model"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].contains("0.91"));
    }
}
