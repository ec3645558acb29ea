//! Factor exposures of a global macro fund: FF5 versus a macro benchmark.
//!
//! The fund's excess return is regressed on the five Fama-French factors
//! and on a small macro model built from rates, dollar, credit and
//! commodity proxies. Both models are compared on the same window. When a
//! live ETF tracks the backtest, their overlap is compared as well.

use super::{coefficient_table, print_fit, print_saved, print_table};
use crate::config::MacroConfig;
use crate::error::{Result, StudyError};
use factorlab_data::local::{FUND_RET, read_panel_csv, write_panel_csv};
use factorlab_data::macro_factors::{CMDTY_RET, DGS10_CHG, HY_OAS_CHG, MACRO_COLUMNS, USD_RET};
use factorlab_data::{JoinKind, Month, MonthlyPanel, MonthlySeries};
use factorlab_output::{Cell, ReportDocument, Table};
use factorlab_regression::{CONST, ModelSummary, OlsFit, stats};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fund excess return column.
pub const FUND_EXCESS: &str = "fund_excess";
/// Local proxy `hml + rmw - cma`.
pub const EQUITY_STYLE_SPREAD: &str = "equity_style_spread";
/// Regressors of the FF5 model.
pub const FF5_FACTORS: [&str; 5] = ["mkt_rf", "smb", "hml", "rmw", "cma"];
/// Macro model candidates in order of preference.
pub const CANDIDATES: [&str; 6] = [
    "mkt_rf",
    USD_RET,
    DGS10_CHG,
    HY_OAS_CHG,
    CMDTY_RET,
    EQUITY_STYLE_SPREAD,
];
/// Regressors used when fewer than three candidates have enough data.
pub const FALLBACK_FACTORS: [&str; 3] = ["mkt_rf", "smb", "hml"];
/// Columns of the model comparison.
pub const COMPARISON_HEADERS: [&str; 7] = [
    "model",
    "n_obs",
    "adj_r2",
    "alpha_monthly",
    "alpha_annualized",
    "resid_vol_annualized",
    "corr_fitted_actual",
];
const SUMMARY_HEADERS: [&str; 8] = [
    "n_obs",
    "r2",
    "adj_r2",
    "alpha_monthly",
    "alpha_annualized",
    "resid_vol_monthly",
    "resid_vol_annualized",
    "corr_fitted_actual",
];
const RISK_FREE: &str = "rf";

/// File names of the global macro artefacts.
pub mod files {
    /// FF5 coefficients on the full sample.
    pub const FF5_COEFFICIENTS: &str = "ff5_coefficients.csv";
    /// Macro model coefficients.
    pub const MACRO_COEFFICIENTS: &str = "macro_model_coefficients.csv";
    /// FF5 versus macro model on the same window.
    pub const MODEL_COMPARISON: &str = "model_comparison.csv";
    /// Live ETF versus backtest statistics.
    pub const LIVE_STATS: &str = "live_vs_backtest_stats.csv";
    /// Monthly external macro factors, reused when a later fetch fails.
    pub const EXTERNAL_FACTORS: &str = "external_factors_monthly.csv";
    /// Markdown report.
    pub const REPORT: &str = "analysis_global_macro.md";
}

/// Column name of the live ETF's monthly return, e.g. `hfgm_ret`.
pub fn live_column(ticker: &str) -> String {
    format!("{}_ret", ticker.to_lowercase())
}

/// File holding the live ETF's monthly returns.
pub fn live_returns_file(ticker: &str) -> String {
    format!("{}_monthly_returns.csv", ticker.to_lowercase())
}

/// Where the external macro factors came from.
#[derive(Debug, Clone)]
pub enum ExternalFactors {
    /// Fetched during this run.
    Live(MonthlyPanel),
    /// Read from the file saved by an earlier run.
    Fallback {
        /// Saved factors
        panel: MonthlyPanel,
        /// Why the fetch was not used
        note: String,
    },
    /// Neither source worked; only local proxies are available.
    Unavailable {
        /// What failed
        note: String,
    },
}

impl ExternalFactors {
    /// Pick the factor source. A successful fetch is saved to `saved_file`;
    /// a failed one falls back to reading it.
    pub fn resolve<E: Display>(fetched: std::result::Result<MonthlyPanel, E>, saved_file: &Path) -> Self {
        let error = match fetched {
            Ok(panel) => {
                if let Err(e) = write_panel_csv(&panel, saved_file, "date") {
                    warn!(path = %saved_file.display(), error = %e, "could not save external factors");
                }
                return Self::Live(panel);
            }
            Err(e) => e,
        };
        if !saved_file.is_file() {
            let note = format!(
                "Online FRED fetch failed ({error}) and no local fallback file was found at {}. \
                 Macro model uses local-only proxies.",
                saved_file.display()
            );
            warn!("{note}");
            return Self::Unavailable { note };
        }
        match read_panel_csv(saved_file) {
            Ok(panel) => {
                let name = saved_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let note = format!("Online FRED fetch failed ({error}). Used local fallback file: {name}.");
                warn!("{note}");
                Self::Fallback { panel, note }
            }
            Err(read_error) => {
                let note = format!(
                    "Online FRED fetch failed ({error}) and local fallback load failed ({read_error}). \
                     Macro model uses local-only proxies."
                );
                warn!("{note}");
                Self::Unavailable { note }
            }
        }
    }

    /// Factor panel, if any source worked.
    pub const fn panel(&self) -> Option<&MonthlyPanel> {
        match self {
            Self::Live(panel) | Self::Fallback { panel, .. } => Some(panel),
            Self::Unavailable { .. } => None,
        }
    }

    /// Note for the report when the live fetch was not used.
    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Live(_) => None,
            Self::Fallback { note, .. } | Self::Unavailable { note } => Some(note),
        }
    }
}

/// Inputs of the study, loaded by the caller.
#[derive(Debug, Clone)]
pub struct GlobalMacroData {
    /// Fund monthly returns, named `fund_ret`
    pub fund: MonthlySeries,
    /// Monthly FF5 factors (`mkt_rf, smb, hml, rmw, cma, rf`)
    pub ff5: MonthlyPanel,
    /// External macro factors
    pub external: ExternalFactors,
    /// Live ETF monthly returns, or why they could not be fetched
    pub live: std::result::Result<MonthlySeries, String>,
}

/// Live ETF versus backtest statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStats {
    /// Months where both series have a return
    pub overlap_months: usize,
    /// Correlation of the two return series
    pub correlation: f64,
    /// Slope of live on backtest: `cov(live, backtest) / var(backtest)`
    pub beta: f64,
    /// Standard deviation of `live - backtest`, annualized
    pub tracking_error_ann: f64,
    /// Mean monthly `live - backtest`, compounded to a year
    pub avg_return_diff_ann: f64,
}

/// One overlapping month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapRow {
    /// Calendar month
    pub month: Month,
    /// Backtest return
    pub backtest: f64,
    /// Live ETF return
    pub live: f64,
}

impl OverlapRow {
    /// `live - backtest`
    pub const fn spread(&self) -> f64 {
        self.live - self.backtest
    }
}

/// Outcome of the live comparison.
#[derive(Debug, Clone)]
pub enum LiveComparison {
    /// Enough overlap to compare.
    Compared {
        /// Summary statistics
        stats: LiveStats,
        /// Months used
        overlap: Vec<OverlapRow>,
    },
    /// Not compared; the reason is shown in the report.
    Unavailable(String),
}

/// Compare a live ETF with the backtest on overlapping months.
pub fn compare_live(backtest: &MonthlySeries, live: &MonthlySeries, min_overlap: usize) -> LiveComparison {
    let overlap: Vec<OverlapRow> = backtest
        .iter()
        .filter_map(|(month, b)| {
            let l = live.get(month)?;
            (b.is_finite() && l.is_finite()).then_some(OverlapRow {
                month,
                backtest: b,
                live: l,
            })
        })
        .collect();
    if overlap.len() < min_overlap.max(2) {
        return LiveComparison::Unavailable(
            "Not enough monthly overlap between the live ETF and the backtest to estimate robust tracking metrics."
                .to_string(),
        );
    }
    let b: Vec<f64> = overlap.iter().map(|r| r.backtest).collect();
    let l: Vec<f64> = overlap.iter().map(|r| r.live).collect();
    let spread: Vec<f64> = overlap.iter().map(OverlapRow::spread).collect();
    let stats = LiveStats {
        overlap_months: overlap.len(),
        correlation: stats::correlation(&b, &l),
        beta: stats::covariance(&l, &b, 1) / stats::variance(&b, 1),
        tracking_error_ann: stats::annualize_volatility(stats::std_dev(&spread)),
        avg_return_diff_ann: stats::annualize_return(stats::mean(&spread)),
    };
    LiveComparison::Compared { stats, overlap }
}

/// Choose macro regressors from candidates with more than `min_obs`
/// non-missing values: the first five when at least five qualify, all of
/// them when three or four do, otherwise [`FALLBACK_FACTORS`].
pub fn select_factors(panel: &MonthlyPanel, min_obs: usize) -> Result<Vec<String>> {
    let mut available = Vec::new();
    for candidate in CANDIDATES {
        if panel.has_column(candidate) && panel.non_null_count(candidate)? > min_obs {
            available.push(candidate.to_string());
        }
    }
    Ok(match available.len() {
        n if n >= 5 => available.into_iter().take(5).collect(),
        n if n >= 3 => available,
        _ => FALLBACK_FACTORS.iter().map(|f| (*f).to_string()).collect(),
    })
}

/// Fitted models and comparisons.
#[derive(Debug, Clone)]
pub struct GlobalMacroStudy {
    core: MonthlyPanel,
    ff5: OlsFit,
    macro_factors: Vec<String>,
    macro_model: OlsFit,
    ff5_same_window: OlsFit,
    external_note: Option<String>,
    live_ticker: String,
    live_returns: Option<MonthlySeries>,
    live: LiveComparison,
}

fn fit_sample(panel: &MonthlyPanel, xs: &[&str], what: &str) -> Result<(MonthlyPanel, OlsFit)> {
    let mut keep = vec![FUND_EXCESS];
    keep.extend_from_slice(xs);
    let sample = panel.drop_nulls(&keep)?;
    if sample.height() <= xs.len() + 1 {
        return Err(StudyError::insufficient(
            "global-macro",
            format!("{} complete months for the {what}", sample.height()),
        ));
    }
    let fit = super::fit_columns(&sample, FUND_EXCESS, xs)?;
    Ok((sample, fit))
}

/// Fit the FF5 and macro models and compare the live ETF.
///
/// # Errors
///
/// Returns an error when the fund and factor months barely overlap or a
/// model cannot be fitted.
pub fn run(data: &GlobalMacroData, config: &MacroConfig) -> Result<GlobalMacroStudy> {
    let core = MonthlyPanel::from_series(&data.fund.clone().renamed(FUND_RET))?
        .join(&data.ff5, JoinKind::Inner)?
        .drop_nulls(&[FUND_RET, RISK_FREE])?
        .with_difference(FUND_EXCESS, FUND_RET, RISK_FREE)?;
    let (_, ff5) = fit_sample(&core, &FF5_FACTORS, "FF5 model")?;
    info!(months = core.height(), r2 = ff5.r_squared(), "fitted FF5 on fund excess returns");

    let mut candidates = core.with_linear_combination(
        EQUITY_STYLE_SPREAD,
        &[("hml", 1.0), ("rmw", 1.0), ("cma", -1.0)],
    )?;
    if let Some(external) = data.external.panel() {
        let present: Vec<&str> = MACRO_COLUMNS
            .iter()
            .copied()
            .filter(|c| external.has_column(c))
            .collect();
        candidates = candidates.join(&external.select(&present)?, JoinKind::Left)?;
    }
    let macro_factors = select_factors(&candidates, config.min_factor_observations)?;
    let refs: Vec<&str> = macro_factors.iter().map(String::as_str).collect();
    let (macro_sample, macro_model) = fit_sample(&candidates, &refs, "macro model")?;
    info!(factors = ?macro_factors, months = macro_sample.height(), "fitted macro model");

    let window = core.restrict_to(&macro_sample.months()?)?;
    let (_, ff5_same_window) = fit_sample(&window, &FF5_FACTORS, "same-window FF5 model")?;

    let (live_returns, live) = match &data.live {
        Ok(series) => {
            let series = series.clone().renamed(live_column(&config.live_ticker));
            let backtest = core.series(FUND_RET)?;
            let comparison = compare_live(&backtest, &series, config.min_live_overlap);
            (Some(series), comparison)
        }
        Err(e) => (
            None,
            LiveComparison::Unavailable(format!(
                "Could not fetch live {} data ({e}).",
                config.live_ticker
            )),
        ),
    };

    Ok(GlobalMacroStudy {
        core,
        ff5,
        macro_factors,
        macro_model,
        ff5_same_window,
        external_note: data.external.note().map(str::to_string),
        live_ticker: config.live_ticker.clone(),
        live_returns,
        live,
    })
}

fn summary_row(summary: &ModelSummary) -> Vec<Cell> {
    vec![
        summary.n_obs.into(),
        summary.r2.into(),
        summary.adj_r2.into(),
        summary.alpha_monthly.into(),
        summary.alpha_annualized.into(),
        summary.resid_vol_monthly.into(),
        summary.resid_vol_annualized.into(),
        summary.corr_fitted_actual.into(),
    ]
}

impl GlobalMacroStudy {
    /// FF5 fit on every month with fund and factor data.
    pub const fn ff5(&self) -> &OlsFit {
        &self.ff5
    }

    /// Chosen macro regressors.
    pub fn macro_factors(&self) -> &[String] {
        &self.macro_factors
    }

    /// Macro model fit.
    pub const fn macro_model(&self) -> &OlsFit {
        &self.macro_model
    }

    /// FF5 re-fitted on the macro model's months.
    pub const fn ff5_same_window(&self) -> &OlsFit {
        &self.ff5_same_window
    }

    /// Live ETF comparison.
    pub const fn live(&self) -> &LiveComparison {
        &self.live
    }

    /// Adjusted R² of the macro model minus that of FF5 on the same window.
    pub fn adj_r2_improvement(&self) -> f64 {
        self.macro_model.adj_r_squared() - self.ff5_same_window.adj_r_squared()
    }

    /// One-row fit summary of the full-sample FF5 model.
    pub fn ff5_summary_table(&self) -> Result<Table> {
        let mut table = Table::new(SUMMARY_HEADERS);
        table.push_row(summary_row(&ModelSummary::from_fit(&self.ff5)))?;
        Ok(table)
    }

    /// FF5 (same window) and macro model side by side.
    pub fn comparison_table(&self) -> Result<Table> {
        let mut table = Table::new(COMPARISON_HEADERS);
        for (name, fit) in [
            ("FF5 (same window)", &self.ff5_same_window),
            ("Proposed Macro Model", &self.macro_model),
        ] {
            let s = ModelSummary::from_fit(fit);
            table.push_row(vec![
                Cell::from(name),
                s.n_obs.into(),
                s.adj_r2.into(),
                s.alpha_monthly.into(),
                s.alpha_annualized.into(),
                s.resid_vol_annualized.into(),
                s.corr_fitted_actual.into(),
            ])?;
        }
        Ok(table)
    }

    /// Live statistics as a one-row table, when compared.
    pub fn live_stats_table(&self) -> Result<Option<Table>> {
        let LiveComparison::Compared { stats, .. } = &self.live else {
            return Ok(None);
        };
        let tag = self.live_ticker.to_lowercase();
        let mut table = Table::new([
            "overlap_months".to_string(),
            format!("corr_{tag}_vs_backtest"),
            format!("beta_{tag}_on_backtest"),
            "tracking_error_ann".to_string(),
            "avg_return_diff_ann".to_string(),
        ]);
        table.push_row(vec![
            stats.overlap_months.into(),
            stats.correlation.into(),
            stats.beta.into(),
            stats.tracking_error_ann.into(),
            stats.avg_return_diff_ann.into(),
        ])?;
        Ok(Some(table))
    }

    /// Overlapping months with both returns and their spread.
    pub fn overlap_table(&self) -> Result<Option<Table>> {
        let LiveComparison::Compared { overlap, .. } = &self.live else {
            return Ok(None);
        };
        let tag = self.live_ticker.to_lowercase();
        let mut table = Table::new([
            "date".to_string(),
            FUND_RET.to_string(),
            live_column(&self.live_ticker),
            format!("spread_{tag}_minus_backtest"),
        ]);
        for row in overlap {
            table.push_row(vec![
                Cell::Text(row.month.to_string()),
                row.backtest.into(),
                row.live.into(),
                row.spread().into(),
            ])?;
        }
        Ok(Some(table))
    }

    fn live_returns_table(&self) -> Result<Option<Table>> {
        let Some(series) = &self.live_returns else {
            return Ok(None);
        };
        let mut table = Table::new(["date", series.name()]);
        for (month, value) in series.iter() {
            table.push_row(vec![Cell::Text(month.end_date().to_string()), value.into()])?;
        }
        Ok(Some(table))
    }

    /// Print both models and the comparison.
    pub fn print(&self) -> Result<()> {
        print_fit("FF5 MODEL (fund excess return)", &self.ff5);
        print_fit(
            &format!("MACRO MODEL ({})", self.macro_factors.join(", ")),
            &self.macro_model,
        );
        print_table("Explainability vs FF5", &self.comparison_table()?, 4);
        println!(
            "  Adj R² improvement (macro - FF5, same window): {:.4}",
            self.adj_r2_improvement()
        );
        match &self.live {
            LiveComparison::Compared { stats, .. } => println!(
                "  {} vs backtest: {} months, corr={:.3}, beta={:.3}, TE={:.3}",
                self.live_ticker,
                stats.overlap_months,
                stats.correlation,
                stats.beta,
                stats.tracking_error_ann
            ),
            LiveComparison::Unavailable(reason) => println!("  {reason}"),
        }
        if let Some(note) = &self.external_note {
            println!("  Note: {note}");
        }
        Ok(())
    }

    /// Markdown report of the study.
    pub fn report(&self) -> Result<ReportDocument> {
        let months = self.core.months()?;
        let (first, last) = match (months.first(), months.last()) {
            (Some(f), Some(l)) => (f.end_date().to_string(), l.end_date().to_string()),
            _ => (String::new(), String::new()),
        };
        let alpha_p = self.ff5.p_value(CONST).unwrap_or(f64::NAN);
        let significance = if alpha_p < 0.05 {
            "statistically significant"
        } else {
            "not statistically significant"
        };

        let mut doc = ReportDocument::new();
        doc.title("CS Global Macro Index (2x Vol, Net 95bps): Factor Exposure Analysis")
            .heading(1, "Data Overview")
            .bullets([
                format!(
                    "Fund file: monthly return series from **{first}** to **{last}** ({} months).",
                    months.len()
                ),
                "FF5 file: daily factor returns compounded to monthly (mkt_rf, smb, hml, rmw, cma, rf)."
                    .to_string(),
                "Fund excess return is computed as fund_ret - rf.".to_string(),
            ])
            .heading(1, "Is FF5 a Good Benchmark Conceptually?")
            .paragraph("FF5 is partially useful but incomplete for a global macro product:")
            .bullets([
                "**Reasonable for** investors who mainly ask whether the fund repackages equity style risk (market, size, value, profitability, investment).",
                "**Inappropriate for** investors expecting a true global macro profile, since macro funds load on rates, FX, commodities and credit spreads beyond the equity cross-section.",
            ])
            .paragraph("FF5 is therefore a good **diagnostic benchmark** for equity-style dependence, but not a complete **economic benchmark** for the strategy's intent.")
            .heading(1, "FF5 Regression Results")
            .heading(2, "Model fit and alpha")
            .table(self.ff5_summary_table()?, 4)
            .paragraph(&format!(
                "Alpha under FF5 is **{significance}** at the 5% level (p-value = {alpha_p:.4})."
            ))
            .heading(2, "FF5 exposures")
            .table(coefficient_table(&self.ff5)?, 4)
            .paragraph("Interpretation:")
            .bullets([
                "The fund carries some equity beta, but FF5 explainability is limited (adjusted R² is modest).",
                "Residual risk remains large, pointing to exposures outside the standard equity style factors.",
            ])
            .heading(1, "Proposed 3-5 Factor Macro Model")
            .paragraph(&format!("Chosen factors: **{}**", self.macro_factors.join(", ")))
            .paragraph("Rationale:")
            .bullets([
                "mkt_rf: broad equity risk premium.",
                "usd_ret: broad dollar moves as the FX exposure proxy.",
                "dgs10_chg: duration and rates shocks (US 10Y yield change).",
                "hy_oas_chg: credit risk appetite and stress.",
                "cmdty_ret: commodity risk.",
                "equity_style_spread: local equity-style cycle proxy when external series are constrained.",
            ])
            .heading(2, "Macro model exposures")
            .table(coefficient_table(&self.macro_model)?, 4)
            .heading(2, "Explainability vs FF5")
            .table(self.comparison_table()?, 4)
            .paragraph(&format!(
                "Improvement in adjusted R² (macro model minus FF5 on the same window): **{:.4}**.",
                self.adj_r2_improvement()
            ))
            .heading(2, "Do benchmark covariances make sense for global macro?")
            .paragraph("More than FF5 alone. A global macro process should co-move with rates repricing, dollar cycles, credit stress regimes and commodity regimes in addition to equity beta. That covariance structure is closer to a strategy delivering hedge-fund-like multi-asset premia.")
            .heading(1, "Risk Premia Interpretation")
            .paragraph("The findings fit a **risk premia harvesting** view when the macro loadings are stable and significant:")
            .bullets([
                "Time-varying compensation for macro risks can explain part of the returns.",
                "Remaining alpha may reflect dynamic timing, implementation edge or omitted factors.",
            ])
            .paragraph("References:")
            .bullets([
                "Fama, E. F., and French, K. R. (2015), A five-factor asset pricing model.",
                "Asness, C. S., Moskowitz, T. J., and Pedersen, L. H. (2013), Value and Momentum Everywhere.",
                "Koijen, R. S. J., Moskowitz, T. J., Pedersen, L. H., and Vrugt, E. B. (2018), Carry.",
                "Moskowitz, T. J., Ooi, Y. H., and Pedersen, L. H. (2012), Time series momentum.",
            ])
            .heading(1, format!("Extra Credit: Backtest vs Live ({})", self.live_ticker));

        match (self.live_stats_table()?, self.overlap_table()?, &self.live) {
            (Some(stats), Some(overlap), _) => {
                doc.table(stats, 4)
                    .paragraph("Overlap months and returns used in the calculation:")
                    .table(overlap, 4)
                    .paragraph("The backtest and the live ETF are directionally related, but the overlap is short and the estimate is preliminary.");
            }
            (_, _, LiveComparison::Unavailable(reason)) => {
                doc.bullets([reason.as_str()]);
            }
            _ => {
                doc.bullets(["Live comparison unavailable."]);
            }
        }

        if let Some(note) = &self.external_note {
            doc.heading(1, "Data Constraint Note").bullets([note.as_str()]);
        }

        doc.heading(1, "Bottom Line").bullets([
            "FF5 alone is **not** a fully appropriate benchmark for this fund's macro mandate.",
            "FF5 is still useful as an equity-risk sanity check on alpha and exposures.",
            "A mixed benchmark of equities, rates, FX, credit and commodities is more economically aligned and generally improves explainability.",
        ]);
        Ok(doc)
    }

    /// Write the tables and the Markdown report.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let mut written = Vec::new();
        for (file, table) in [
            (files::FF5_COEFFICIENTS, coefficient_table(&self.ff5)?),
            (files::MACRO_COEFFICIENTS, coefficient_table(&self.macro_model)?),
            (files::MODEL_COMPARISON, self.comparison_table()?),
        ] {
            let path = out_dir.join(file);
            table.write_csv(&path)?;
            written.push(path);
        }
        if let Some(table) = self.live_stats_table()? {
            let path = out_dir.join(files::LIVE_STATS);
            table.write_csv(&path)?;
            written.push(path);
        }
        if let Some(table) = self.live_returns_table()? {
            let path = out_dir.join(live_returns_file(&self.live_ticker));
            table.write_csv(&path)?;
            written.push(path);
        }
        let report = out_dir.join(files::REPORT);
        self.report()?.write_markdown(&report)?;
        written.push(report);

        let refs: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
        print_saved(&refs);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studies::COEFFICIENT_HEADERS;
    use crate::studies::fixtures::{months, noise};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Synthetic {
        fund: MonthlySeries,
        ff5: MonthlyPanel,
        external: MonthlyPanel,
    }

    /// Fund returns loading 0.4 on the market and 0.5 on the dollar.
    fn synthetic(n: usize, seed: u64) -> Synthetic {
        let mut rng = StdRng::seed_from_u64(seed);
        let months = months(n);
        let mut draw = |scale: f64| -> Vec<f64> { (0..n).map(|_| noise(&mut rng, scale)).collect() };
        let ff5_values: Vec<Vec<f64>> = (0..5).map(|_| draw(0.04)).collect();
        let macro_values: Vec<Vec<f64>> = (0..4).map(|_| draw(0.02)).collect();
        let eps = draw(0.003);

        let rf = 0.001;
        let fund = MonthlySeries::from_pairs(
            FUND_RET,
            (0..n).map(|i| {
                (
                    months[i],
                    rf + 0.002 + 0.4 * ff5_values[0][i] + 0.5 * macro_values[0][i] + eps[i],
                )
            }),
        );
        let mut ff5_columns: Vec<(String, Vec<Option<f64>>)> = FF5_FACTORS
            .iter()
            .zip(&ff5_values)
            .map(|(name, v)| ((*name).to_string(), v.iter().copied().map(Some).collect()))
            .collect();
        ff5_columns.push((RISK_FREE.to_string(), vec![Some(rf); n]));
        let external_columns = MACRO_COLUMNS
            .iter()
            .zip(&macro_values)
            .map(|(name, v)| ((*name).to_string(), v.iter().copied().map(Some).collect()))
            .collect();
        Synthetic {
            fund,
            ff5: MonthlyPanel::from_columns(&months, ff5_columns).unwrap(),
            external: MonthlyPanel::from_columns(&months, external_columns).unwrap(),
        }
    }

    fn data(s: &Synthetic, external: ExternalFactors) -> GlobalMacroData {
        GlobalMacroData {
            fund: s.fund.clone(),
            ff5: s.ff5.clone(),
            external,
            live: Err("offline".to_string()),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factorlab-macro-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn macro_model_uses_first_five_candidates() {
        let s = synthetic(96, 7);
        let study = run(
            &data(&s, ExternalFactors::Live(s.external.clone())),
            &MacroConfig::default(),
        )
        .unwrap();
        assert_eq!(
            study.macro_factors(),
            &["mkt_rf", USD_RET, DGS10_CHG, HY_OAS_CHG, CMDTY_RET].map(String::from)
        );
        assert_relative_eq!(study.macro_model().param(USD_RET).unwrap(), 0.5, epsilon = 0.05);
        assert_relative_eq!(study.ff5().param("mkt_rf").unwrap(), 0.4, epsilon = 0.1);
        assert!(study.adj_r2_improvement() > 0.0);
        assert_eq!(study.ff5_same_window().nobs(), 96);
    }

    #[test]
    fn without_external_data_falls_back_to_equity_factors() {
        let s = synthetic(72, 8);
        let external = ExternalFactors::Unavailable {
            note: "fetch failed".to_string(),
        };
        let study = run(&data(&s, external), &MacroConfig::default()).unwrap();
        assert_eq!(study.macro_factors(), &FALLBACK_FACTORS.map(String::from));
        let doc = study.report().unwrap().to_markdown();
        assert!(doc.contains("## Data Constraint Note"));
        assert!(doc.contains("fetch failed"));
    }

    #[test]
    fn three_or_four_candidates_are_all_kept() {
        let s = synthetic(72, 9);
        let partial = s.external.select(&[USD_RET, DGS10_CHG]).unwrap();
        let study = run(
            &data(&s, ExternalFactors::Live(partial)),
            &MacroConfig::default(),
        )
        .unwrap();
        assert_eq!(
            study.macro_factors(),
            &["mkt_rf", USD_RET, DGS10_CHG, EQUITY_STYLE_SPREAD].map(String::from)
        );
    }

    #[test]
    fn short_candidates_are_not_selected() {
        let s = synthetic(50, 10);
        let factors = select_factors(
            &s.ff5.join(&s.external, JoinKind::Left).unwrap(),
            MacroConfig::default().min_factor_observations,
        )
        .unwrap();
        assert_eq!(factors, FALLBACK_FACTORS.map(String::from));
    }

    #[test]
    fn live_etf_tracking_statistics() {
        let months = months(10);
        let backtest = MonthlySeries::from_pairs(
            FUND_RET,
            months.iter().enumerate().map(|(i, m)| (*m, 0.01 * (i as f64 - 4.0))),
        );
        let live = MonthlySeries::from_pairs(
            "hfgm_ret",
            backtest.iter().skip(2).map(|(m, r)| (m, r + 0.001)),
        );
        let LiveComparison::Compared { stats, overlap } = compare_live(&backtest, &live, 4) else {
            panic!("expected a comparison");
        };
        assert_eq!(stats.overlap_months, 8);
        assert_eq!(overlap.len(), 8);
        assert_relative_eq!(stats.correlation, 1.0, epsilon = 1e-12);
        assert_relative_eq!(stats.beta, 1.0, epsilon = 1e-12);
        assert_relative_eq!(stats.tracking_error_ann, 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats.avg_return_diff_ann, 1.001_f64.powi(12) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(overlap[0].spread(), 0.001, epsilon = 1e-12);
    }

    #[test]
    fn short_live_overlap_is_reported() {
        let months = months(3);
        let backtest = MonthlySeries::from_pairs(FUND_RET, months.iter().map(|m| (*m, 0.01)));
        let live = backtest.clone().renamed("hfgm_ret");
        assert!(matches!(
            compare_live(&backtest, &live, 4),
            LiveComparison::Unavailable(_)
        ));
    }

    #[test]
    fn fetched_factors_are_saved_and_reused() {
        let dir = temp_dir("resolve");
        let path = dir.join(files::EXTERNAL_FACTORS);
        let _ = std::fs::remove_file(&path);

        let missing = ExternalFactors::resolve(Err::<MonthlyPanel, _>("timeout"), &path);
        assert!(missing.panel().is_none());
        assert!(missing.note().unwrap().contains("no local fallback file"));

        let s = synthetic(12, 11);
        let live = ExternalFactors::resolve(Ok::<_, String>(s.external.clone()), &path);
        assert!(live.note().is_none());
        assert!(path.is_file());

        let fallback = ExternalFactors::resolve(Err::<MonthlyPanel, _>("timeout"), &path);
        let panel = fallback.panel().unwrap();
        assert_eq!(panel.height(), 12);
        assert!(panel.has_column(HY_OAS_CHG));
        assert!(fallback.note().unwrap().contains(files::EXTERNAL_FACTORS));
    }

    #[test]
    fn outputs_include_live_tables_when_compared() {
        let s = synthetic(84, 12);
        let live = MonthlySeries::from_pairs(
            "HFGM",
            s.fund.iter().skip(70).map(|(m, r)| (m, r * 0.9)),
        );
        let mut input = data(&s, ExternalFactors::Live(s.external.clone()));
        input.live = Ok(live);
        let study = run(&input, &MacroConfig::default()).unwrap();

        let out = temp_dir("outputs");
        let written = study.write_outputs(&out).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        for expected in [
            files::FF5_COEFFICIENTS,
            files::MACRO_COEFFICIENTS,
            files::MODEL_COMPARISON,
            files::LIVE_STATS,
            "hfgm_monthly_returns.csv",
            files::REPORT,
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }

        for file in [files::FF5_COEFFICIENTS, files::MACRO_COEFFICIENTS] {
            let coefficients = Table::read_csv(&out.join(file)).unwrap();
            assert_eq!(coefficients.headers(), &COEFFICIENT_HEADERS.map(String::from));
            assert_eq!(coefficients.rows()[0][0], Cell::Text("const".to_string()));
        }

        let comparison = Table::read_csv(&out.join(files::MODEL_COMPARISON)).unwrap();
        assert_eq!(comparison.headers(), &COMPARISON_HEADERS.map(String::from));
        assert_eq!(comparison.len(), 2);
        let stats = Table::read_csv(&out.join(files::LIVE_STATS)).unwrap();
        assert_eq!(stats.rows()[0][0], Cell::Integer(14));
        let beta = stats.rows()[0][2].as_f64().unwrap();
        assert_relative_eq!(beta, 0.9, epsilon = 1e-9);

        let report = std::fs::read_to_string(out.join(files::REPORT)).unwrap();
        assert!(report.starts_with("# CS Global Macro Index"));
        assert!(report.contains("## Extra Credit: Backtest vs Live (HFGM)"));
        assert!(report.contains("spread_hfgm_minus_backtest"));
        assert!(!report.contains("## Data Constraint Note"));
    }
}
