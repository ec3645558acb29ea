//! ETF excess returns on the CAPM and on the six-factor model (FF5 + UMD).

use super::{
    FF6_FACTORS, MKT_RF, excess_column, excess_return_panel, ff6_panel, files, fit_columns,
    print_fit, print_saved, print_table,
};
use crate::error::{Result, StudyError};
use factorlab_data::french::FactorTable;
use factorlab_data::MonthlySeries;
use factorlab_output::{Cell, Table};
use factorlab_regression::{CONST, OlsFit};
use std::path::{Path, PathBuf};
use tracing::info;

/// Headers of the coefficient file.
pub const RESULT_HEADERS: [&str; 4] = ["Factor", "Beta", "T-stat", "P-value"];

/// CAPM and six-factor fits of one ETF.
#[derive(Debug, Clone)]
pub struct Ff6Study {
    ticker: String,
    capm: OlsFit,
    ff6: OlsFit,
}

/// Fit both models on months where every factor is present.
///
/// # Errors
///
/// Returns an error when the sample is too short for seven parameters.
pub fn run(etf: &MonthlySeries, umd: &MonthlySeries, ff5: &FactorTable) -> Result<Ff6Study> {
    let ticker = etf.name().to_string();
    let factors = ff6_panel(ff5, umd)?;
    let sample = excess_return_panel(etf, &factors, &FF6_FACTORS)?;
    if sample.height() <= FF6_FACTORS.len() + 1 {
        return Err(StudyError::insufficient(
            "ff6",
            format!("{} months for seven parameters", sample.height()),
        ));
    }
    let y = excess_column(&ticker);
    let capm = fit_columns(&sample, &y, &[MKT_RF])?;
    let ff6 = fit_columns(&sample, &y, &FF6_FACTORS)?;
    info!(ticker = %ticker, months = sample.height(), "fitted CAPM and FF6");
    Ok(Ff6Study { ticker, capm, ff6 })
}

impl Ff6Study {
    /// Single-factor market model.
    pub const fn capm(&self) -> &OlsFit {
        &self.capm
    }

    /// Six-factor model.
    pub const fn ff6(&self) -> &OlsFit {
        &self.ff6
    }

    /// Coefficients with the intercept first, labelled `Alpha`.
    pub fn results_table(&self) -> Result<Table> {
        let mut table = Table::new(RESULT_HEADERS);
        for term in std::iter::once(CONST).chain(FF6_FACTORS) {
            let label = if term == CONST { "Alpha" } else { term };
            let c = self.ff6.coefficient(term);
            table.push_row(vec![
                Cell::from(label),
                c.as_ref().map(|c| c.coef).into(),
                c.as_ref().map(|c| c.t_stat).into(),
                c.as_ref().map(|c| c.p_value).into(),
            ])?;
        }
        Ok(table)
    }

    /// Print the six-factor fit and the market beta under both models.
    pub fn print(&self) -> Result<()> {
        print_fit("FAMA-FRENCH 6-FACTOR MODEL", &self.ff6);
        print_table(&format!("{} FF6 loadings", self.ticker), &self.results_table()?, 4);
        println!("\n--- CAPM vs FF6 market beta ---");
        println!(
            "  CAPM market beta: {:.4}",
            self.capm.param(MKT_RF).unwrap_or(f64::NAN)
        );
        println!(
            "  FF6 market beta:  {:.4}",
            self.ff6.param(MKT_RF).unwrap_or(f64::NAN)
        );
        Ok(())
    }

    /// Write the coefficient file.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(files::FF6_RESULTS);
        self.results_table()?.write_csv(&path)?;
        print_saved(&[path.as_path()]);
        Ok(vec![path])
    }
}
