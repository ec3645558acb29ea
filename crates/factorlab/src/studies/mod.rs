//! Factor regression studies.
//!
//! Each study takes data that has already been fetched, fits its models and
//! returns a result value. Results print themselves to the console and write
//! their CSV (and SVG) artefacts with `write_outputs`. Downloading and
//! caching live in the binary so the studies stay deterministic.

pub mod ff6;
pub mod global_macro;
pub mod long_leg;
pub mod methodology;
pub mod other_etfs;
pub mod umd_beta;

use crate::error::Result;
use factorlab_data::french::FactorTable;
use factorlab_data::{JoinKind, MonthlyPanel, MonthlySeries};
use factorlab_output::{Cell, Table};
use factorlab_regression::{Ols, OlsFit};
use std::path::Path;

/// Market excess return column of the French tables.
pub const MKT_RF: &str = "Mkt-RF";
/// Size factor.
pub const SMB: &str = "SMB";
/// Value factor.
pub const HML: &str = "HML";
/// Profitability factor.
pub const RMW: &str = "RMW";
/// Investment factor.
pub const CMA: &str = "CMA";
/// Risk-free rate.
pub const RF: &str = "RF";
/// Momentum factor.
pub const UMD: &str = "UMD";

/// Regressors of the six-factor model, in reporting order.
pub const FF6_FACTORS: [&str; 6] = [MKT_RF, SMB, HML, RMW, CMA, UMD];

/// File names of the study artefacts.
pub mod files {
    /// UMD beta summary metrics.
    pub const UMD_BETA_SUMMARY: &str = "q2_1_regression_summary.csv";
    /// Aligned ETF and UMD returns.
    pub const UMD_BETA_DATA: &str = "q2_1_spmo_umd_data.csv";
    /// UMD beta diagnostics figure.
    pub const UMD_BETA_FIGURE: &str = "q2_1_spmo_umd_regression_diagnostics.svg";
    /// Methodology comparison.
    pub const METHODOLOGY: &str = "q2_2_methodology_comparison.csv";
    /// Long-leg model comparison.
    pub const LONG_LEG_MODELS: &str = "q2_3_all_models_summary.csv";
    /// Decile-based momentum portfolios.
    pub const LONG_LEG_PORTFOLIOS: &str = "q2_3_momentum_portfolios.csv";
    /// Long-leg beta and R² bars.
    pub const LONG_LEG_FIGURE: &str = "q2_3_momentum_decomposition.svg";
    /// Six-factor coefficients.
    pub const FF6_RESULTS: &str = "q2_4_ff6_regression_results.csv";
    /// Six-factor loadings of the other ETFs.
    pub const OTHER_ETFS: &str = "q2_5_other_etfs_ff6.csv";
    /// Markdown report.
    pub const REPORT_MD: &str = "REPORT_Q2.md";
    /// PDF report.
    pub const REPORT_PDF: &str = "REPORT_Q2.pdf";
}

/// Name of the excess-return column for `ticker`.
pub fn excess_column(ticker: &str) -> String {
    format!("{ticker}_excess")
}

/// FF5 factors joined with UMD on month, complete rows only.
///
/// # Errors
///
/// Returns an error if the tables cannot be aligned.
pub fn ff6_panel(ff5: &FactorTable, umd: &MonthlySeries) -> Result<MonthlyPanel> {
    let umd = umd.clone().renamed(UMD);
    let panel = MonthlyPanel::from_table(&ff5.complete_rows())?.join_series(&umd, JoinKind::Inner)?;
    Ok(panel)
}

/// ETF returns joined with the factor panel, with an excess-return column.
///
/// Rows missing the ETF return, the risk-free rate or any of `required`
/// are dropped.
///
/// # Errors
///
/// Returns an error if a required column is absent.
pub fn excess_return_panel(
    etf: &MonthlySeries,
    factors: &MonthlyPanel,
    required: &[&str],
) -> Result<MonthlyPanel> {
    let ticker = etf.name();
    let mut keep = vec![ticker, RF];
    keep.extend_from_slice(required);
    let panel = MonthlyPanel::from_series(etf)?
        .join(factors, JoinKind::Inner)?
        .drop_nulls(&keep)?
        .with_difference(&excess_column(ticker), ticker, RF)?;
    Ok(panel)
}

/// Fit `y ~ const + xs` on columns of `panel`.
///
/// # Errors
///
/// Returns an error for missing columns, null values or a failed fit.
pub fn fit_columns(panel: &MonthlyPanel, y: &str, xs: &[&str]) -> Result<OlsFit> {
    let mut ols = Ols::new(panel.column_values(y)?);
    for x in xs {
        ols = ols.regressor(*x, panel.column_values(x)?);
    }
    Ok(ols.fit()?)
}

/// Columns of the global macro coefficient tables.
pub const COEFFICIENT_HEADERS: [&str; 4] = ["factor", "coef", "t_stat", "p_value"];

/// Coefficient table with columns [`COEFFICIENT_HEADERS`].
///
/// # Errors
///
/// Never fails for a well-formed fit; the error comes from
/// [`Table::push_row`].
pub fn coefficient_table(fit: &OlsFit) -> Result<Table> {
    let mut table = Table::new(COEFFICIENT_HEADERS);
    for c in fit.coefficients() {
        table.push_row(vec![
            Cell::Text(c.name),
            c.coef.into(),
            c.t_stat.into(),
            c.p_value.into(),
        ])?;
    }
    Ok(table)
}

/// Print the coefficient table and fit statistics of a model.
pub fn print_fit(title: &str, fit: &OlsFit) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
    println!(
        "  {:<14} {:>10} {:>10} {:>8} {:>8}",
        "term", "coef", "std err", "t", "P>|t|"
    );
    for c in fit.coefficients() {
        println!(
            "  {:<14} {:>10.4} {:>10.4} {:>8.2} {:>8.4}",
            c.name, c.coef, c.std_err, c.t_stat, c.p_value
        );
    }
    println!(
        "  N = {}   R² = {:.4}   Adj R² = {:.4}   F = {:.2} (p={:.4})",
        fit.nobs(),
        fit.r_squared(),
        fit.adj_r_squared(),
        fit.f_statistic(),
        fit.f_pvalue()
    );
}

/// Metric/value cell formatted to a fixed number of decimals.
pub(crate) fn fixed(value: f64, digits: usize) -> Cell {
    if value.is_finite() {
        Cell::Text(format!("{value:.digits$}"))
    } else {
        Cell::Missing
    }
}

/// Console banner used at the top of each study.
pub fn print_banner(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a table in fixed-width form below a short rule.
pub(crate) fn print_table(title: &str, table: &Table, digits: usize) {
    println!("\n--- {title} ---");
    print!("{}", table.to_ascii_table(digits));
}

pub(crate) fn print_saved(paths: &[&Path]) {
    let names: Vec<String> = paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    if !names.is_empty() {
        println!("Saved: {}", names.join(", "));
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic monthly data with known factor loadings.

    use super::*;
    use factorlab_data::Month;
    use factorlab_data::french::{FF5_COLUMNS, parse_factor_table};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    pub(crate) fn months(n: usize) -> Vec<Month> {
        let mut m = Month::new(2016, 1).unwrap();
        (0..n)
            .map(|_| {
                let cur = m;
                m = m.succ();
                cur
            })
            .collect()
    }

    pub(crate) fn noise(rng: &mut StdRng, scale: f64) -> f64 {
        (rng.r#gen::<f64>() - 0.5) * 2.0 * scale
    }

    /// Monthly FF5 table in the French text layout plus a UMD series.
    pub(crate) fn factor_data(n: usize, seed: u64) -> (FactorTable, MonthlySeries) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut text = String::from("Fama/French 5 Factors (2x3)\n\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n");
        let mut umd = Vec::new();
        for m in months(n) {
            let row: Vec<String> = (0..5)
                .map(|_| format!("{:.2}", noise(&mut rng, 4.0)))
                .chain(std::iter::once("0.20".to_string()))
                .collect();
            text.push_str(&format!("{:04}{:02},{}\n", m.year(), m.month(), row.join(",")));
            umd.push((m, noise(&mut rng, 0.05)));
        }
        text.push_str("\n Annual Factors: January-December\n");
        let table = parse_factor_table(&text, &FF5_COLUMNS).unwrap();
        (table, MonthlySeries::from_pairs(UMD, umd))
    }

    /// ETF returns `rf + 0.001 + 1.0 mkt + beta_umd umd + noise`.
    pub(crate) fn etf_returns(
        ticker: &str,
        ff6: &MonthlyPanel,
        beta_umd: f64,
        seed: u64,
    ) -> MonthlySeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let months = ff6.months().unwrap();
        let mkt = ff6.column_values(MKT_RF).unwrap();
        let rf = ff6.column_values(RF).unwrap();
        let umd = ff6.column_values(UMD).unwrap();
        MonthlySeries::from_pairs(
            ticker,
            months.into_iter().enumerate().map(|(i, m)| {
                (
                    m,
                    rf[i] + 0.001 + mkt[i] + beta_umd * umd[i] + noise(&mut rng, 0.004),
                )
            }),
        )
    }
}
