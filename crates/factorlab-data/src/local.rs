//! Local input files: fund returns workbook, daily factor Parquet, and CSV
//! snapshots of monthly panels.

use crate::error::{DataError, Result};
use crate::month::Month;
use crate::panel::{JoinKind, MonthlyPanel};
use crate::series::MonthlySeries;
use calamine::{DataType as _, Reader, open_workbook_auto};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column name for fund returns loaded from the workbook.
pub const FUND_RET: &str = "fund_ret";

/// Daily factor columns expected in the Parquet file.
pub const DAILY_FACTOR_COLUMNS: [&str; 6] = ["mkt_rf", "smb", "hml", "rmw", "cma", "rf"];

/// Return the first existing candidate: `<data_dir>/<file>`, then
/// `<code_dir>/<file>`.
pub fn resolve_input(file: &str, data_dir: &Path, code_dir: &Path) -> Option<PathBuf> {
    [data_dir.join(file), code_dir.join(file)]
        .into_iter()
        .find(|p| p.is_file())
}

/// Load monthly fund returns from the first sheet of an Excel workbook.
///
/// The first row is a header; the `date` and `return` columns are matched
/// case-insensitively. Rows missing either value are skipped.
pub fn load_fund_returns(path: &Path) -> Result<MonthlySeries> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::MissingData {
            symbol: path.display().to_string(),
            reason: "workbook has no sheets".to_string(),
        })??;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| DataError::MissingData {
        symbol: path.display().to_string(),
        reason: "empty sheet".to_string(),
    })?;
    let find = |name: &str| {
        header
            .iter()
            .position(|c| c.to_string().trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    };
    let date_idx = find("date")?;
    let ret_idx = find("return")?;

    let mut series = MonthlySeries::new(FUND_RET);
    for row in rows {
        let month = row.get(date_idx).and_then(|cell| {
            cell.as_datetime()
                .map(|dt| Month::from_date(dt.date()))
                .or_else(|| cell.get_string().and_then(Month::parse_iso))
        });
        let value = row.get(ret_idx).and_then(|cell| {
            cell.as_f64()
                .or_else(|| cell.get_string().and_then(|s| s.trim().parse().ok()))
        });
        if let (Some(month), Some(value)) = (month, value) {
            series.insert(month, value);
        }
    }

    info!(path = %path.display(), rows = series.len(), "fund returns loaded");
    Ok(series)
}

/// Load daily factor returns from Parquet and compound them to months.
///
/// The file must have a `dt` column plus [`DAILY_FACTOR_COLUMNS`]. Values
/// that do not convert to floats are treated as missing.
pub fn load_daily_factors_monthly(path: &Path) -> Result<MonthlyPanel> {
    let df = ParquetReader::new(File::open(path)?).finish()?;
    debug!(path = %path.display(), rows = df.height(), "read daily factors");

    let dt = df.column("dt")?.cast(&DataType::String)?;
    let dates: Vec<Option<NaiveDate>> = dt
        .str()?
        .into_iter()
        .map(|s| s.and_then(|s| s.get(..10)).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
        .collect();

    let mut monthly = Vec::with_capacity(DAILY_FACTOR_COLUMNS.len());
    for name in DAILY_FACTOR_COLUMNS {
        let values = df.column(name)?.cast(&DataType::Float64)?;
        let daily: Vec<(NaiveDate, f64)> = dates
            .iter()
            .zip(values.f64()?)
            .filter_map(|(d, v)| Some(((*d)?, v?)))
            .collect();
        monthly.push(MonthlySeries::compound_daily(name, &daily));
    }

    let refs: Vec<&MonthlySeries> = monthly.iter().collect();
    let panel = MonthlyPanel::align(&refs, JoinKind::Outer)?;
    info!(path = %path.display(), months = panel.height(), "daily factors compounded to monthly");
    Ok(panel)
}

/// Write a panel as CSV with a leading month-end date column.
///
/// Missing values are written as empty cells.
pub fn write_panel_csv(panel: &MonthlyPanel, path: &Path, date_header: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![date_header.to_string()];
    header.extend(panel.columns());
    writer.write_record(&header)?;

    for (month, values) in panel.rows()? {
        let mut record = vec![month.end_date().to_string()];
        record.extend(values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = panel.height(), "saved");
    Ok(())
}

/// Read a CSV written by [`write_panel_csv`] (or any CSV whose first column
/// is an ISO date and whose other columns are numeric).
pub fn read_panel_csv(path: &Path) -> Result<MonthlyPanel> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let names: Vec<String> = reader.headers()?.iter().skip(1).map(str::to_string).collect();

    let mut months = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    for record in reader.records() {
        let record = record?;
        let Some(month) = record.get(0).and_then(Month::parse_iso) else {
            continue;
        };
        months.push(month);
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(record.get(i + 1).and_then(|v| v.parse().ok()));
        }
    }

    if months.is_empty() {
        return Err(DataError::MissingData {
            symbol: path.display().to_string(),
            reason: "no dated rows".to_string(),
        });
    }
    MonthlyPanel::from_columns(&months, names.into_iter().zip(columns).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factorlab-local-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn panel_csv_round_trip_keeps_missing_cells() {
        let months = vec![Month::new(2020, 1).unwrap(), Month::new(2020, 2).unwrap()];
        let panel = MonthlyPanel::from_columns(
            &months,
            vec![
                ("usd_ret".to_string(), vec![Some(0.01), None]),
                ("dgs10_chg".to_string(), vec![Some(-0.002), Some(0.001)]),
            ],
        )
        .unwrap();

        let path = temp_path("external_factors_monthly.csv");
        write_panel_csv(&panel, &path, "date").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,usd_ret,dgs10_chg\n2020-01-31,0.01,-0.002\n2020-02-29,,0.001"));

        let back = read_panel_csv(&path).unwrap();
        assert_eq!(back.months().unwrap(), months);
        assert_eq!(back.optional_values("usd_ret").unwrap(), vec![Some(0.01), None]);
        assert_relative_eq!(back.column_values("dgs10_chg").unwrap()[0], -0.002);
    }

    #[test]
    fn read_rejects_file_without_rows() {
        let path = temp_path("empty.csv");
        std::fs::write(&path, "Date,SPMO,UMD\n").unwrap();
        assert!(read_panel_csv(&path).is_err());
    }

    #[test]
    fn daily_factors_are_compounded() {
        let path = temp_path("ff5_daily.parquet");
        let mut df = df! {
            "dt" => ["2024-01-02", "2024-01-03", "2024-02-01"],
            "mkt_rf" => [0.01, 0.02, -0.01],
            "smb" => [0.0, 0.0, 0.0],
            "hml" => [0.001, 0.001, 0.001],
            "rmw" => [0.0, 0.0, 0.0],
            "cma" => [0.0, 0.0, 0.0],
            "rf" => [0.0001, 0.0001, 0.0001],
        }
        .unwrap();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let panel = load_daily_factors_monthly(&path).unwrap();
        assert_eq!(panel.height(), 2);
        assert_relative_eq!(
            panel.column_values("mkt_rf").unwrap()[0],
            1.01 * 1.02 - 1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(panel.column_values("rf").unwrap()[1], 0.0001, epsilon = 1e-12);
    }

    #[test]
    fn resolve_prefers_data_dir() {
        let data_dir = temp_path("data");
        let code_dir = temp_path("code");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::create_dir_all(&code_dir).unwrap();
        std::fs::write(code_dir.join("fund.xlsx"), b"x").unwrap();
        assert_eq!(resolve_input("fund.xlsx", &data_dir, &code_dir), Some(code_dir.join("fund.xlsx")));
        std::fs::write(data_dir.join("fund.xlsx"), b"x").unwrap();
        assert_eq!(resolve_input("fund.xlsx", &data_dir, &code_dir), Some(data_dir.join("fund.xlsx")));
        assert_eq!(resolve_input("missing.xlsx", &data_dir, &code_dir), None);
    }

    #[test]
    fn missing_workbook_is_an_error() {
        assert!(load_fund_returns(Path::new("/nonexistent/fund.xlsx")).is_err());
    }
}
