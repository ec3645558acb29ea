//! Does the ETF track the long leg (past winners) rather than the
//! long-short momentum factor?
//!
//! The ETF return is regressed on the top momentum decile, on the
//! winners-minus-losers spread (value and equal weighted) and on the
//! official UMD factor. A long-only fund should fit the winner decile best.

use super::{files, print_saved, print_table};
use crate::error::{Result, StudyError};
use factorlab_data::french::{DecilePortfolios, Weighting};
use factorlab_data::local::write_panel_csv;
use factorlab_data::{JoinKind, MonthlyPanel, MonthlySeries};
use factorlab_output::{Cell, Figure, Panel, PanelKind, Table};
use factorlab_regression::{Ols, OlsFit, stats};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const STUDY: &str = "long-leg";

/// Official UMD series name in this study.
pub const UMD_OFFICIAL: &str = "UMD_Official";

/// Models in reporting and plotting order.
pub const MODELS: [&str; 5] = [
    "Winners_VW",
    "Winners_EW",
    UMD_OFFICIAL,
    "MomLS_VW",
    "MomLS_EW",
];

/// Columns of the saved portfolio file.
pub const PORTFOLIO_COLUMNS: [&str; 7] = [
    "Winners_VW",
    "Winners_EW",
    "Losers_VW",
    "Losers_EW",
    "MomLS_VW",
    "MomLS_EW",
    UMD_OFFICIAL,
];

/// One single-regressor model.
#[derive(Debug, Clone)]
pub struct LegModel {
    /// Regressor name
    pub name: String,
    /// Fitted model
    pub fit: OlsFit,
}

impl LegModel {
    /// Slope on the regressor.
    pub fn beta(&self) -> f64 {
        self.fit.param(&self.name).unwrap_or(f64::NAN)
    }

    /// t statistic of the slope.
    pub fn t_stat(&self) -> f64 {
        self.fit.t_value(&self.name).unwrap_or(f64::NAN)
    }

    /// Intercept scaled to an annual percentage (`α × 12 × 100`).
    pub fn alpha_annual_pct(&self) -> f64 {
        self.fit.alpha().unwrap_or(f64::NAN) * 12.0 * 100.0
    }
}

/// Result of the long-leg study.
#[derive(Debug, Clone)]
pub struct LongLegStudy {
    ticker: String,
    portfolios: MonthlyPanel,
    models: Vec<LegModel>,
    corr_vw: f64,
    corr_ew: f64,
}

/// Winner, loser and long-short series for one weighting. Without an
/// equal-weighted section the value-weighted series stand in, renamed.
fn legs(deciles: &DecilePortfolios, weighting: Weighting) -> Result<[MonthlySeries; 3]> {
    let source = if weighting == Weighting::Equal && !deciles.has_equal_weighted() {
        warn!("no equal-weighted deciles; using value-weighted returns for the EW legs");
        Weighting::Value
    } else {
        weighting
    };
    let suffix = weighting.suffix();
    Ok([
        deciles.winners(source)?.renamed(format!("Winners_{suffix}")),
        deciles.losers(source)?.renamed(format!("Losers_{suffix}")),
        deciles.long_short(source)?.renamed(format!("MomLS_{suffix}")),
    ])
}

/// Fit the ETF on each momentum portfolio.
///
/// # Errors
///
/// Returns an error when fewer than three months align or a fit fails.
pub fn run(
    etf: &MonthlySeries,
    umd: &MonthlySeries,
    deciles: &DecilePortfolios,
) -> Result<LongLegStudy> {
    let ticker = etf.name().to_string();
    let [winners_vw, losers_vw, ls_vw] = legs(deciles, Weighting::Value)?;
    let [winners_ew, losers_ew, ls_ew] = legs(deciles, Weighting::Equal)?;
    let umd = umd.clone().renamed(UMD_OFFICIAL);

    let portfolios = MonthlyPanel::align(
        &[
            &winners_vw,
            &winners_ew,
            &losers_vw,
            &losers_ew,
            &ls_vw,
            &ls_ew,
            &umd,
        ],
        JoinKind::Inner,
    )?;
    let sample = MonthlyPanel::from_series(etf)?
        .join(&portfolios.select(&MODELS)?, JoinKind::Inner)?
        .drop_all_nulls()?;
    if sample.height() < 3 {
        return Err(StudyError::insufficient(
            STUDY,
            format!("only {} months align for {ticker} and the deciles", sample.height()),
        ));
    }

    let y = sample.column_values(&ticker)?;
    let models = MODELS
        .iter()
        .map(|name| {
            let fit = Ols::new(y.clone())
                .regressor(*name, sample.column_values(name)?)
                .fit()?;
            Ok(LegModel {
                name: (*name).to_string(),
                fit,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let official = sample.column_values(UMD_OFFICIAL)?;
    let corr_vw = stats::correlation(&sample.column_values("MomLS_VW")?, &official);
    let corr_ew = stats::correlation(&sample.column_values("MomLS_EW")?, &official);
    info!(ticker = %ticker, months = sample.height(), "fitted long-leg models");

    Ok(LongLegStudy {
        ticker,
        portfolios,
        models,
        corr_vw,
        corr_ew,
    })
}

impl LongLegStudy {
    /// Fitted models in [`MODELS`] order.
    pub fn models(&self) -> &[LegModel] {
        &self.models
    }

    /// Model by regressor name.
    pub fn model(&self, name: &str) -> Option<&LegModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Momentum portfolios over months where all are present.
    pub const fn portfolios(&self) -> &MonthlyPanel {
        &self.portfolios
    }

    /// Model with the highest finite R².
    pub fn best_model(&self) -> Option<&LegModel> {
        self.models
            .iter()
            .filter(|m| m.fit.r_squared().is_finite())
            .max_by(|a, b| a.fit.r_squared().total_cmp(&b.fit.r_squared()))
    }

    /// Correlations of the VW and EW long-short spreads with official UMD.
    pub const fn umd_correlations(&self) -> (f64, f64) {
        (self.corr_vw, self.corr_ew)
    }

    /// Model comparison: `Model, Beta, T-stat, R-squared, Alpha (annual %)`.
    pub fn summary_table(&self) -> Result<Table> {
        let mut table = Table::new(["Model", "Beta", "T-stat", "R-squared", "Alpha (annual %)"]);
        for m in &self.models {
            table.push_row(vec![
                Cell::Text(m.name.clone()),
                m.beta().into(),
                m.t_stat().into(),
                m.fit.r_squared().into(),
                m.alpha_annual_pct().into(),
            ])?;
        }
        Ok(table)
    }

    /// Beta and R² bar charts.
    pub fn figure(&self) -> Figure {
        let labels: Vec<String> = self.models.iter().map(|m| m.name.clone()).collect();
        Figure::new(2)
            .panel(
                Panel::new(
                    format!("{} beta to momentum portfolios", self.ticker),
                    PanelKind::Bars {
                        labels: labels.clone(),
                        values: self.models.iter().map(LegModel::beta).collect(),
                    },
                )
                .labels("", "Beta"),
            )
            .panel(
                Panel::new(
                    "R-squared",
                    PanelKind::Bars {
                        labels,
                        values: self.models.iter().map(|m| m.fit.r_squared()).collect(),
                    },
                )
                .labels("", "R²"),
            )
    }

    /// Print the model table, the best model and the UMD correlations.
    pub fn print(&self) -> Result<()> {
        print_table(
            &format!("{} vs LONG LEG and LONG-SHORT", self.ticker),
            &self.summary_table()?,
            4,
        );
        if let Some(best) = self.best_model() {
            println!("\nBest fit (highest R²): {}", best.name);
        }
        println!(
            "Correlation with official UMD: MomLS_VW={:.4}, MomLS_EW={:.4}",
            self.corr_vw, self.corr_ew
        );
        Ok(())
    }

    /// Write the model table, the portfolios and the bar chart.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let models = out_dir.join(files::LONG_LEG_MODELS);
        self.summary_table()?.write_csv(&models)?;
        let portfolios = out_dir.join(files::LONG_LEG_PORTFOLIOS);
        write_panel_csv(
            &self.portfolios.select(&PORTFOLIO_COLUMNS)?,
            &portfolios,
            "Date",
        )?;
        let figure = out_dir.join(files::LONG_LEG_FIGURE);
        self.figure().write_svg(&figure)?;
        let written = vec![models, portfolios, figure];
        let refs: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
        print_saved(&refs);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studies::UMD;
    use crate::studies::fixtures::{months, noise};
    use approx::assert_relative_eq;
    use factorlab_data::french::parse_deciles;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Deciles in the combined 21-column layout, the ETF tracking D10 (VW)
    /// and UMD tracking the VW spread.
    fn inputs(n: usize) -> (MonthlySeries, MonthlySeries, DecilePortfolios) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut text = String::from("10 Portfolios Formed on Prior 12-2\n");
        let mut etf = Vec::new();
        let mut umd = Vec::new();
        for m in months(n) {
            let row: Vec<f64> = (0..20).map(|_| (noise(&mut rng, 5.0) * 100.0).round() / 100.0).collect();
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.2}")).collect();
            text.push_str(&format!("{:04}{:02},{}\n", m.year(), m.month(), cells.join(",")));
            etf.push((m, 0.002 + 0.9 * row[9] / 100.0 + noise(&mut rng, 0.002)));
            umd.push((m, (row[9] - row[0]) / 100.0 + noise(&mut rng, 0.003)));
        }
        let deciles = parse_deciles(&text).unwrap();
        (
            MonthlySeries::from_pairs("SPMO", etf),
            MonthlySeries::from_pairs(UMD, umd),
            deciles,
        )
    }

    #[test]
    fn winner_decile_fits_best() {
        let (etf, umd, deciles) = inputs(60);
        let study = run(&etf, &umd, &deciles).unwrap();
        assert_eq!(study.models().len(), 5);
        assert_eq!(study.best_model().unwrap().name, "Winners_VW");
        let winners = study.model("Winners_VW").unwrap();
        assert_relative_eq!(winners.beta(), 0.9, epsilon = 0.05);
        assert!(study.umd_correlations().0 > 0.9);
    }

    #[test]
    fn alpha_is_scaled_to_annual_percent() {
        let (etf, umd, deciles) = inputs(60);
        let study = run(&etf, &umd, &deciles).unwrap();
        let m = study.model("Winners_VW").unwrap();
        assert_relative_eq!(
            m.alpha_annual_pct(),
            m.fit.alpha().unwrap() * 1200.0,
            epsilon = 1e-12
        );
        let table = study.summary_table().unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.rows()[2][0], Cell::Text(UMD_OFFICIAL.into()));
    }

    #[test]
    fn equal_weights_fall_back_to_value_weights() {
        let text = (0..6)
            .map(|i| format!("2020{:02},{}", i + 1, (1..=10).map(|d| format!("{}", d + i)).collect::<Vec<_>>().join(",")))
            .collect::<Vec<_>>()
            .join("\n");
        let deciles = parse_deciles(&text).unwrap();
        let [w_ew, _, ls_ew] = legs(&deciles, Weighting::Equal).unwrap();
        let [w_vw, _, ls_vw] = legs(&deciles, Weighting::Value).unwrap();
        assert_eq!(w_ew.name(), "Winners_EW");
        assert_eq!(w_ew.values(), w_vw.values());
        assert_eq!(ls_ew.values(), ls_vw.values());
    }

    #[test]
    fn writes_all_artefacts() {
        let (etf, umd, deciles) = inputs(24);
        let study = run(&etf, &umd, &deciles).unwrap();
        let dir = std::env::temp_dir().join(format!("factorlab-longleg-{}", std::process::id()));
        let written = study.write_outputs(&dir).unwrap();
        assert_eq!(written.len(), 3);
        let header = std::fs::read_to_string(&written[1]).unwrap();
        assert!(header.starts_with(
            "Date,Winners_VW,Winners_EW,Losers_VW,Losers_EW,MomLS_VW,MomLS_EW,UMD_Official\n"
        ));
        assert!(std::fs::read_to_string(&written[2]).unwrap().contains("<svg"));
    }
}
