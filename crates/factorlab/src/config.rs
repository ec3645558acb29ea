//! Study configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! gives the standard setup. Command-line flags override individual fields
//! after loading.

use crate::error::{Result, StudyError};
use chrono::{Local, NaiveDate};
use factorlab_data::Month;
use factorlab_data::french::{URL_DECILES, URL_FF5, URL_UMD};
use factorlab_data::fred::{SERIES_DGS10, SERIES_HY_OAS, SERIES_USD};
use factorlab_data::yahoo::{RETURN_MAX, RETURN_MIN, ReturnBounds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An ETF studied alongside the main ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtfSpec {
    /// Yahoo Finance symbol
    pub ticker: String,
    /// Full fund name
    pub name: String,
}

impl EtfSpec {
    /// Create a spec.
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
        }
    }
}

/// Ken French Data Library archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrenchUrls {
    /// Momentum factor
    pub umd: String,
    /// Five-factor 2x3 monthly file
    pub ff5: String,
    /// 10 portfolios formed on prior 12-2 returns
    pub deciles: String,
}

impl Default for FrenchUrls {
    fn default() -> Self {
        Self {
            umd: URL_UMD.to_string(),
            ff5: URL_FF5.to_string(),
            deciles: URL_DECILES.to_string(),
        }
    }
}

/// Settings for the global macro study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// Preferred directory for local inputs; also receives fetched data
    pub data_dir: PathBuf,
    /// Fallback directory for local inputs
    pub code_dir: PathBuf,
    /// Directory for the tables and Markdown report
    pub out_dir: PathBuf,
    /// Fund monthly returns workbook
    pub fund_file: String,
    /// Daily Fama-French five factors
    pub ff5_file: String,
    /// First month of the external factor download
    pub external_start: NaiveDate,
    /// FRED broad dollar index
    pub usd_series: String,
    /// FRED 10-year Treasury yield
    pub dgs10_series: String,
    /// FRED high-yield option-adjusted spread
    pub hy_oas_series: String,
    /// Yahoo symbol of the commodity index
    pub commodity_symbol: String,
    /// A candidate factor needs more than this many observations
    pub min_factor_observations: usize,
    /// Live ETF replicating the backtest
    pub live_ticker: String,
    /// First day of the live ETF history
    pub live_start: NaiveDate,
    /// Minimum overlapping months for live-vs-backtest statistics
    pub min_live_overlap: usize,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            code_dir: PathBuf::from("."),
            out_dir: PathBuf::from("output/global_macro"),
            fund_file: "CS Global Macro Index at 2x Vol Net of 95bps 2025.09.xlsx".to_string(),
            ff5_file: "ff.five_factor.parquet".to_string(),
            external_start: date(2002, 1, 1),
            usd_series: SERIES_USD.to_string(),
            dgs10_series: SERIES_DGS10.to_string(),
            hy_oas_series: SERIES_HY_OAS.to_string(),
            commodity_symbol: "^SPGSCI".to_string(),
            min_factor_observations: 60,
            live_ticker: "HFGM".to_string(),
            live_start: date(2022, 1, 1),
            min_live_overlap: 4,
        }
    }
}

impl MacroConfig {
    /// Month the external factors are cut at.
    pub fn external_start_month(&self) -> Month {
        Month::from_date(self.external_start)
    }
}

/// Configuration shared by all studies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// First day of the ETF price history
    pub start_date: NaiveDate,
    /// Last day of the ETF price history; today when absent
    pub end_date: Option<NaiveDate>,
    /// Main ETF
    pub ticker: String,
    /// Other momentum ETFs for the FF6 comparison
    pub other_etfs: Vec<EtfSpec>,
    /// Factor data archives
    pub french: FrenchUrls,
    /// HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Monthly returns below this are dropped
    pub return_min: f64,
    /// Monthly returns above this are dropped
    pub return_max: f64,
    /// Directory for the CSV, figure and report outputs
    pub out_dir: PathBuf,
    /// Fixed Newey-West lag; automatic when absent
    pub newey_west_lags: Option<usize>,
    /// Range of UMD betas expected from the methodology comparison
    pub predicted_beta: (f64, f64),
    /// Bins of the residual histogram
    pub histogram_bins: usize,
    /// Global macro study settings
    #[serde(rename = "macro")]
    pub macro_study: MacroConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            start_date: date(2015, 10, 1),
            end_date: None,
            ticker: "SPMO".to_string(),
            other_etfs: vec![
                EtfSpec::new("MTUM", "iShares MSCI USA Momentum Factor ETF"),
                EtfSpec::new("QMOM", "Alpha Architect US Quantitative Momentum ETF"),
            ],
            french: FrenchUrls::default(),
            request_timeout_secs: 30,
            return_min: RETURN_MIN,
            return_max: RETURN_MAX,
            out_dir: PathBuf::from("output"),
            newey_west_lags: None,
            predicted_beta: (0.20, 0.30),
            histogram_bins: 25,
            macro_study: MacroConfig::default(),
        }
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl StudyConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or an invalid configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or return the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                Self::from_json(&text)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`StudyError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(StudyError::Config("ticker is empty".to_string()));
        }
        if self.start_date > self.end_date() {
            return Err(StudyError::Config(format!(
                "start date {} is after end date {}",
                self.start_date,
                self.end_date()
            )));
        }
        if !(self.return_min < self.return_max) {
            return Err(StudyError::Config(format!(
                "return bounds [{}, {}] are empty",
                self.return_min, self.return_max
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(StudyError::Config("request timeout must be positive".to_string()));
        }
        if self.histogram_bins == 0 {
            return Err(StudyError::Config("histogram needs at least one bin".to_string()));
        }
        Ok(())
    }

    /// Configured end date, or today.
    pub fn end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Return bounds for monthly ETF returns.
    pub const fn return_bounds(&self) -> ReturnBounds {
        ReturnBounds {
            min: self.return_min,
            max: self.return_max,
        }
    }

    /// HTTP timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full name of a configured ETF, falling back to the ticker.
    pub fn etf_name<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.other_etfs
            .iter()
            .find(|e| e.ticker == ticker)
            .map_or(ticker, |e| e.name.as_str())
    }

    /// Path of an output file.
    pub fn output_path(&self, file: &str) -> PathBuf {
        self.out_dir.join(file)
    }
}
