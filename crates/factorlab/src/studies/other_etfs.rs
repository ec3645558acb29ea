//! Six-factor loadings of other momentum ETFs.
//!
//! Each ETF is fitted independently; a ticker whose download or fit fails
//! is recorded as an error row and the others still run.

use super::{FF6_FACTORS, excess_column, excess_return_panel, files, fit_columns, print_saved};
use crate::config::EtfSpec;
use crate::error::Result;
use factorlab_data::{MonthlyPanel, MonthlySeries};
use factorlab_output::{Cell, Table};
use factorlab_regression::OlsFit;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Headers of the loadings file.
pub const HEADERS: [&str; 10] = [
    "ticker", "alpha_ann", "Mkt-RF", "SMB", "HML", "RMW", "CMA", "UMD", "R2", "nobs",
];

/// Outcome for one ETF.
#[derive(Debug, Clone)]
pub enum EtfOutcome {
    /// The six-factor model was fitted.
    Fitted {
        /// Ticker and fund name
        etf: EtfSpec,
        /// Six-factor fit on excess returns
        fit: Box<OlsFit>,
    },
    /// Download or fit failed.
    Failed {
        /// Ticker and fund name
        etf: EtfSpec,
        /// Error message
        error: String,
    },
}

impl EtfOutcome {
    /// The ETF this outcome belongs to.
    pub const fn etf(&self) -> &EtfSpec {
        match self {
            Self::Fitted { etf, .. } | Self::Failed { etf, .. } => etf,
        }
    }
}

/// Annualized six-factor alpha in percent: `((1 + α)^12 − 1) × 100`.
pub fn alpha_annual_pct(fit: &OlsFit) -> f64 {
    fit.alpha_annualized() * 100.0
}

/// Fit one ETF.
///
/// # Errors
///
/// Returns an error when the returns do not align with the factors or the
/// fit fails.
pub fn fit_etf(returns: &MonthlySeries, factors: &MonthlyPanel) -> Result<OlsFit> {
    let sample = excess_return_panel(returns, factors, &FF6_FACTORS)?;
    fit_columns(&sample, &excess_column(returns.name()), &FF6_FACTORS)
}

/// Results for all configured ETFs.
#[derive(Debug, Clone, Default)]
pub struct OtherEtfsStudy {
    outcomes: Vec<EtfOutcome>,
}

impl OtherEtfsStudy {
    /// Record an ETF: `returns` is the download result for it.
    pub fn add<E: std::fmt::Display>(
        &mut self,
        etf: EtfSpec,
        returns: std::result::Result<MonthlySeries, E>,
        factors: &MonthlyPanel,
    ) {
        let fitted = returns
            .map_err(|e| e.to_string())
            .and_then(|r| fit_etf(&r.renamed(&etf.ticker), factors).map_err(|e| e.to_string()));
        let outcome = match fitted {
            Ok(fit) => {
                println!(
                    "  {} FF6: Mkt-RF={:.3}, SMB={:.3}, UMD={:.3}, R2={:.3}",
                    etf.ticker,
                    fit.param("Mkt-RF").unwrap_or(f64::NAN),
                    fit.param("SMB").unwrap_or(f64::NAN),
                    fit.param("UMD").unwrap_or(f64::NAN),
                    fit.r_squared()
                );
                EtfOutcome::Fitted {
                    etf,
                    fit: Box::new(fit),
                }
            }
            Err(error) => {
                warn!(ticker = %etf.ticker, %error, "skipping ETF");
                println!("  Skip {}: {error}", etf.ticker);
                EtfOutcome::Failed { etf, error }
            }
        };
        self.outcomes.push(outcome);
    }

    /// Every outcome in configuration order.
    pub fn outcomes(&self) -> &[EtfOutcome] {
        &self.outcomes
    }

    /// Loadings of fitted ETFs; failed tickers are left out.
    pub fn loadings_table(&self) -> Result<Table> {
        let mut table = Table::new(HEADERS);
        for outcome in &self.outcomes {
            let EtfOutcome::Fitted { etf, fit } = outcome else {
                continue;
            };
            let mut row = vec![
                Cell::from(etf.ticker.as_str()),
                Cell::from(alpha_annual_pct(fit)),
            ];
            row.extend(FF6_FACTORS.iter().map(|f| Cell::from(fit.param(f))));
            row.push(Cell::from(fit.r_squared()));
            row.push(Cell::from(fit.nobs()));
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Write the loadings file when at least one ETF was fitted.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let table = self.loadings_table()?;
        if table.is_empty() {
            warn!("no ETF could be fitted; loadings file not written");
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(files::OTHER_ETFS);
        table.write_csv(&path)?;
        print_saved(&[path.as_path()]);
        Ok(vec![path])
    }
}
