//! Beta of a momentum ETF to the Fama-French UMD factor.
//!
//! Two models are fitted on the months where the ETF, UMD, the market
//! excess return and the risk-free rate are all present:
//!
//! 1. `R_etf = α + β·UMD + ε`, which omits the market and so overstates
//!    the UMD loading of a long-only fund;
//! 2. `R_etf − RF = α + β_mkt·(Mkt-RF) + β_umd·UMD + ε`, the reported model.
//!
//! Residual diagnostics (Jarque-Bera, Breusch-Pagan, Durbin-Watson) and a
//! Newey-West t statistic are computed for the second model.

use super::{
    MKT_RF, UMD, excess_column, excess_return_panel, ff6_panel, files, fit_columns, fixed,
    print_fit, print_saved, print_table,
};
use crate::config::StudyConfig;
use crate::error::{Result, StudyError};
use factorlab_data::french::FactorTable;
use factorlab_data::local::{read_panel_csv, write_panel_csv};
use factorlab_data::{Month, MonthlyPanel, MonthlySeries};
use factorlab_output::{Cell, Figure, Panel, PanelKind, Table};
use factorlab_regression::stats::{self, MONTHS_PER_YEAR};
use factorlab_regression::{CONST, HacErrors, NeweyWestConfig, OlsFit, ResidualDiagnostics};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STUDY: &str = "umd-beta";

/// Lags reported in the lead/lag correlation check.
pub const LAGS: [i32; 3] = [-1, 0, 1];

/// Result of the UMD beta study.
#[derive(Debug, Clone)]
pub struct UmdBetaStudy {
    ticker: String,
    data: MonthlyPanel,
    simple: OlsFit,
    controlled: OlsFit,
    diagnostics: ResidualDiagnostics,
    hac: HacErrors,
    correlation: f64,
    lag_correlations: Vec<(i32, f64)>,
    start: Month,
    end: Month,
    histogram_bins: usize,
}

/// Fit the UMD beta models for `etf` (named by its ticker).
///
/// # Errors
///
/// Returns an error when fewer than four months align or a fit fails.
pub fn run(
    etf: &MonthlySeries,
    umd: &MonthlySeries,
    ff5: &FactorTable,
    config: &StudyConfig,
) -> Result<UmdBetaStudy> {
    let ticker = etf.name().to_string();
    let ff6 = ff6_panel(ff5, umd)?;
    let data = excess_return_panel(etf, &ff6, &[UMD, MKT_RF])?;
    if data.height() < 4 {
        return Err(StudyError::insufficient(
            STUDY,
            format!("only {} months align for {ticker}, UMD and FF5", data.height()),
        ));
    }
    let (Some(start), Some(end)) = (data.first_month()?, data.last_month()?) else {
        return Err(StudyError::insufficient(STUDY, "empty sample"));
    };

    let etf_values = data.column_values(&ticker)?;
    let umd_values = data.column_values(UMD)?;
    let correlation = stats::correlation(&etf_values, &umd_values);
    let lag_correlations = LAGS
        .iter()
        .map(|&lag| (lag, stats::lagged_correlation(&etf_values, &umd_values, lag)))
        .collect();

    let simple = fit_columns(&data, &ticker, &[UMD])?;
    let controlled = fit_columns(&data, &excess_column(&ticker), &[MKT_RF, UMD])?;
    let diagnostics = controlled.diagnostics()?;
    let hac = controlled.newey_west(NeweyWestConfig {
        lags: config.newey_west_lags,
        ..NeweyWestConfig::default()
    })?;
    info!(
        ticker = %ticker,
        months = data.height(),
        beta_umd = controlled.param(UMD).unwrap_or(f64::NAN),
        "fitted UMD beta"
    );

    Ok(UmdBetaStudy {
        ticker,
        data,
        simple,
        controlled,
        diagnostics,
        hac,
        correlation,
        lag_correlations,
        start,
        end,
        histogram_bins: config.histogram_bins,
    })
}

impl UmdBetaStudy {
    /// ETF ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Aligned sample: ETF, UMD, Mkt-RF, RF and the ETF excess return.
    pub const fn data(&self) -> &MonthlyPanel {
        &self.data
    }

    /// `R_etf ~ UMD`.
    pub const fn simple(&self) -> &OlsFit {
        &self.simple
    }

    /// `R_etf − RF ~ Mkt-RF + UMD`.
    pub const fn controlled(&self) -> &OlsFit {
        &self.controlled
    }

    /// Residual diagnostics of the market-controlled model.
    pub const fn diagnostics(&self) -> &ResidualDiagnostics {
        &self.diagnostics
    }

    /// Newey-West errors of the market-controlled model.
    pub const fn hac(&self) -> &HacErrors {
        &self.hac
    }

    /// UMD loading controlling for the market.
    pub fn beta_umd(&self) -> f64 {
        self.controlled.param(UMD).unwrap_or(f64::NAN)
    }

    /// Contemporaneous correlation of ETF and UMD returns.
    pub const fn correlation(&self) -> f64 {
        self.correlation
    }

    /// Correlations at lags −1, 0 and +1.
    pub fn lag_correlations(&self) -> &[(i32, f64)] {
        &self.lag_correlations
    }

    /// First and last month of the sample.
    pub const fn span(&self) -> (Month, Month) {
        (self.start, self.end)
    }

    /// `Metric,Value` summary with values formatted as text.
    pub fn summary_table(&self) -> Table {
        let fit = &self.controlled;
        let alpha = fit.alpha().unwrap_or(f64::NAN);
        let t = |name: &str| fit.t_value(name).unwrap_or(f64::NAN);
        let jb = &self.diagnostics.jarque_bera;
        let bp = &self.diagnostics.breusch_pagan;
        let rows: Vec<(&str, Cell)> = vec![
            ("Beta (UMD)", fixed(self.beta_umd(), 4)),
            ("Alpha (monthly)", fixed(alpha, 6)),
            ("Alpha (annualized)", fixed(fit.alpha_annualized(), 4)),
            ("Alpha t-stat", fixed(t(CONST), 2)),
            ("Beta t-stat", fixed(t(UMD), 2)),
            ("R-squared", fixed(fit.r_squared(), 4)),
            ("Adj R-squared", fixed(fit.adj_r_squared(), 4)),
            ("Correlation(SPMO, UMD)", fixed(self.correlation, 4)),
            ("Residual Std (monthly)", fixed(fit.resid_std(), 4)),
            ("N", Cell::from(fit.nobs())),
            ("Start", Cell::Text(self.start.to_string())),
            ("End", Cell::Text(self.end.to_string())),
            (
                "Beta (UMD) simple",
                fixed(self.simple.param(UMD).unwrap_or(f64::NAN), 4),
            ),
            ("R-squared simple", fixed(self.simple.r_squared(), 4)),
            (
                "Beta t-stat (Newey-West)",
                fixed(self.hac.t_value(UMD).unwrap_or(f64::NAN), 2),
            ),
            ("Newey-West lags", Cell::from(self.hac.lags)),
            ("Jarque-Bera", fixed(jb.statistic, 2)),
            ("Jarque-Bera p-value", fixed(jb.p_value, 4)),
            ("Breusch-Pagan", fixed(bp.lm, 2)),
            ("Breusch-Pagan p-value", fixed(bp.lm_p_value, 4)),
            ("Durbin-Watson", fixed(self.diagnostics.durbin_watson, 2)),
        ];
        Table::metrics(rows.into_iter().map(|(k, v)| (k.to_string(), v)))
    }

    /// Four-panel residual diagnostics figure, or `None` when the fit has
    /// non-finite residuals.
    pub fn diagnostics_figure(&self) -> Result<Option<Figure>> {
        let fit = &self.controlled;
        let resid = fit.resid();
        if !fit.r_squared().is_finite() || resid.iter().any(|r| !r.is_finite()) {
            return Ok(None);
        }
        let umd = self.data.column_values(UMD)?;
        let excess = self.data.column_values(&excess_column(&self.ticker))?;
        let months = self.data.months()?;
        let alpha = fit.alpha().unwrap_or(0.0);
        let beta = self.beta_umd();

        let scatter = Panel::new(
            format!("{} excess vs UMD", self.ticker),
            PanelKind::Scatter {
                points: umd.iter().zip(&excess).map(|(x, y)| (x * 100.0, y * 100.0)).collect(),
                fit: Some((alpha * 100.0, beta)),
            },
        )
        .labels("UMD (%)", format!("{} excess (%)", self.ticker))
        .legend(format!(
            "β_UMD={beta:.3} (ctrl Mkt), R²={:.3}",
            fit.r_squared()
        ));

        let residuals = Panel::new(
            "Residuals over time",
            PanelKind::Line {
                points: months
                    .iter()
                    .zip(resid)
                    .map(|(m, r)| (fractional_year(*m), r * 100.0))
                    .collect(),
                reference_y: Some(0.0),
            },
        )
        .labels("Date", "Residual (%)");

        let histogram = Panel::new(
            "Residual distribution",
            PanelKind::Histogram {
                values: resid.iter().map(|r| r * 100.0).collect(),
                bins: self.histogram_bins,
            },
        )
        .labels("Residual (%)", "Density");

        let (qq_points, qq_line) = normal_probability_plot(resid);
        let qq = Panel::new(
            "Q-Q",
            PanelKind::Scatter {
                points: qq_points,
                fit: Some(qq_line),
            },
        )
        .labels("Theoretical quantiles", "Ordered residuals");

        Ok(Some(
            Figure::new(2)
                .panel(scatter)
                .panel(residuals)
                .panel(histogram)
                .panel(qq),
        ))
    }

    /// Print the alignment check, both fits and the diagnostics.
    pub fn print(&self) -> Result<()> {
        let ticker = &self.ticker;
        let etf = self.data.column_values(ticker)?;
        let umd = self.data.column_values(UMD)?;

        println!("\n--- Merge check: {ticker} vs UMD ---");
        println!(
            "{ticker:<5} mean = {:.6}, std = {:.6}",
            stats::mean(&etf),
            stats::std_dev(&etf)
        );
        println!(
            "UMD   mean = {:.6}, std = {:.6}",
            stats::mean(&umd),
            stats::std_dev(&umd)
        );
        println!("Correlation({ticker}, UMD) = {:.4}", self.correlation);
        println!("First 5 rows of merged data:");
        println!("  {:<10} {:>10} {:>10}", "Date", ticker, UMD);
        for (month, values) in self.data.select(&[ticker.as_str(), UMD])?.head(5).rows()? {
            let cell = |v: Option<f64>| v.map_or_else(String::new, |v| format!("{v:.6}"));
            println!(
                "  {:<10} {:>10} {:>10}",
                month.end_date().to_string(),
                cell(values[0]),
                cell(values[1])
            );
        }
        println!("\nLag correlations ({ticker} vs UMD):");
        for (lag, c) in &self.lag_correlations {
            println!("  Lag {lag:+}: {c:.4}");
        }
        println!(
            "\nMerged: {} months, {} to {}",
            self.data.height(),
            self.start,
            self.end
        );

        print_fit(
            &format!("(1) SIMPLE: {ticker} = α + β(UMD) + ε  [omitted market bias]"),
            &self.simple,
        );
        print_fit(
            &format!("(2) MARKET-CONTROLLED: {ticker}_excess = α + β_mkt(Mkt-RF) + β_umd(UMD) + ε"),
            &self.controlled,
        );

        let fit = &self.controlled;
        let alpha = fit.alpha().unwrap_or(f64::NAN);
        println!("\n--- Key results (market-controlled) ---");
        println!(
            "Beta (UMD, controlling for market): {:.4}  t={:.2}  p={:.4}  t_NW={:.2}",
            self.beta_umd(),
            fit.t_value(UMD).unwrap_or(f64::NAN),
            fit.p_value(UMD).unwrap_or(f64::NAN),
            self.hac.t_value(UMD).unwrap_or(f64::NAN)
        );
        println!("R²: {:.4}", fit.r_squared());
        println!(
            "Alpha (monthly): {alpha:.6}  ({:.2}% annualized)",
            fit.alpha_annualized() * 100.0
        );

        let d = &self.diagnostics;
        println!("\n--- Diagnostics (market-controlled model) ---");
        println!(
            "Jarque-Bera: {:.2} (p={:.4}), Breusch-Pagan: {:.2} (p={:.4}), Durbin-Watson: {:.2}",
            d.jarque_bera.statistic,
            d.jarque_bera.p_value,
            d.breusch_pagan.lm,
            d.breusch_pagan.lm_p_value,
            d.durbin_watson
        );

        let r2 = fit.r_squared();
        println!("\n--- Variance decomposition (market-controlled) ---");
        println!(
            "Explained by Mkt-RF + UMD: {:.1}%, Unexplained: {:.1}%",
            r2 * 100.0,
            (1.0 - r2) * 100.0
        );
        print_table("Summary", &self.summary_table(), 4);
        Ok(())
    }

    /// Write the summary CSV, the aligned data CSV and the diagnostics SVG.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let summary = out_dir.join(files::UMD_BETA_SUMMARY);
        self.summary_table().write_csv(&summary)?;

        let data = out_dir.join(files::UMD_BETA_DATA);
        write_panel_csv(&self.data.select(&[self.ticker.as_str(), UMD])?, &data, "Date")?;

        let mut written = vec![summary, data];
        if let Some(figure) = self.diagnostics_figure()? {
            let path = out_dir.join(files::UMD_BETA_FIGURE);
            figure.write_svg(&path)?;
            written.push(path);
        }
        let refs: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
        print_saved(&refs);
        Ok(written)
    }
}

/// ETF and UMD returns saved by an earlier UMD beta run.
#[derive(Debug, Clone)]
pub struct SavedReturns {
    /// ETF monthly returns
    pub etf: MonthlySeries,
    /// UMD monthly returns over the same months
    pub umd: MonthlySeries,
}

/// Reload the aligned returns written by [`UmdBetaStudy::write_outputs`].
///
/// Returns `Ok(None)` when the file does not exist or was written for a
/// different ticker.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or lacks the `UMD`
/// column.
pub fn load_q1_merged(path: &Path, ticker: &str) -> Result<Option<SavedReturns>> {
    if !path.is_file() {
        return Ok(None);
    }
    let panel = read_panel_csv(path)?;
    if !panel.has_column(ticker) {
        debug!(path = %path.display(), ticker, "saved returns are for another ticker");
        return Ok(None);
    }
    let saved = SavedReturns {
        etf: panel.series(ticker)?,
        umd: panel.series(UMD)?,
    };
    info!(path = %path.display(), months = saved.etf.len(), "reusing saved returns");
    Ok(Some(saved))
}

fn fractional_year(m: Month) -> f64 {
    f64::from(m.year()) + f64::from(m.month() - 1) / MONTHS_PER_YEAR
}

/// Points of a normal probability plot (theoretical quantile, ordered
/// residual) and the least-squares line through them as
/// `(intercept, slope)`.
fn normal_probability_plot(resid: &[f64]) -> (Vec<(f64, f64)>, (f64, f64)) {
    let mut ordered = resid.to_vec();
    ordered.sort_by(f64::total_cmp);
    let q = stats::normal_order_quantiles(ordered.len());
    let slope = stats::covariance(&q, &ordered, 1) / stats::variance(&q, 1);
    let intercept = stats::mean(&ordered) - slope * stats::mean(&q);
    (q.into_iter().zip(ordered).collect(), (intercept, slope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studies::fixtures::{etf_returns, factor_data};
    use crate::studies::{ff6_panel, files};
    use approx::assert_relative_eq;

    fn study(n: usize, beta: f64) -> UmdBetaStudy {
        let (ff5, umd) = factor_data(n, 11);
        let ff6 = ff6_panel(&ff5, &umd).unwrap();
        let etf = etf_returns("SPMO", &ff6, beta, 12);
        run(&etf, &umd, &ff5, &StudyConfig::default()).unwrap()
    }

    fn out_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("factorlab-umd-{}-{name}", std::process::id()))
    }

    #[test]
    fn recovers_umd_loading() {
        let s = study(72, 0.3);
        assert_eq!(s.data().height(), 72);
        assert_relative_eq!(s.beta_umd(), 0.3, epsilon = 0.03);
        assert_relative_eq!(
            s.controlled().param(MKT_RF).unwrap(),
            1.0,
            epsilon = 0.03
        );
        assert!(s.controlled().r_squared() > 0.9);
        assert_eq!(s.lag_correlations().len(), 3);
        assert_relative_eq!(s.lag_correlations()[1].1, s.correlation(), epsilon = 1e-12);
    }

    #[test]
    fn summary_has_reported_metrics() {
        let s = study(48, 0.25);
        let table = s.summary_table();
        assert_eq!(table.metric("N"), Some(&Cell::Integer(48)));
        assert_eq!(table.metric("Start"), Some(&Cell::Text("2016-01".into())));
        assert_eq!(table.metric("End"), Some(&Cell::Text("2019-12".into())));
        let beta: f64 = table.metric("Beta (UMD)").unwrap().to_field().parse().unwrap();
        assert_relative_eq!(beta, s.beta_umd(), epsilon = 1e-4);
        assert!(table.metric("Durbin-Watson").is_some());
        assert!(table.metric("Beta t-stat (Newey-West)").is_some());
    }

    #[test]
    fn too_short_sample_is_rejected() {
        let (ff5, umd) = factor_data(3, 1);
        let ff6 = ff6_panel(&ff5, &umd).unwrap();
        let etf = etf_returns("SPMO", &ff6, 0.3, 2);
        let err = run(&etf, &umd, &ff5, &StudyConfig::default()).unwrap_err();
        assert!(err.to_string().contains("umd-beta"));
    }

    #[test]
    fn outputs_round_trip_through_saved_returns() {
        let s = study(36, 0.2);
        let dir = out_dir("round-trip");
        let written = s.write_outputs(&dir).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.is_file()));

        let saved = load_q1_merged(&dir.join(files::UMD_BETA_DATA), "SPMO")
            .unwrap()
            .unwrap();
        assert_eq!(saved.etf.len(), 36);
        let original = s.data().series("SPMO").unwrap();
        for (month, value) in original.iter() {
            assert_relative_eq!(saved.etf.get(month).unwrap(), value, epsilon = 1e-12);
        }
        assert!(load_q1_merged(&dir.join("missing.csv"), "SPMO").unwrap().is_none());
    }

    #[test]
    fn saved_returns_for_another_ticker_are_ignored() {
        let s = study(24, 0.2);
        let dir = out_dir("other-ticker");
        s.write_outputs(&dir).unwrap();

        let path = dir.join(files::UMD_BETA_DATA);
        assert!(load_q1_merged(&path, "SPMO").unwrap().is_some());
        assert!(load_q1_merged(&path, "MTUM").unwrap().is_none());
    }

    #[test]
    fn probability_plot_is_monotone() {
        let resid = [0.3, -0.1, 0.05, -0.4, 0.2, 0.0];
        let (points, (_, slope)) = normal_probability_plot(&resid);
        assert_eq!(points.len(), 6);
        assert!(points.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 <= w[1].1));
        assert!(slope > 0.0);
    }
}
