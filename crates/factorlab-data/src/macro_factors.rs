//! Monthly macro proxy factors built from FRED and Yahoo series.

use crate::error::Result;
use crate::month::Month;
use crate::panel::{JoinKind, MonthlyPanel};
use crate::series::MonthlySeries;
use chrono::NaiveDate;

/// Monthly change of the trade-weighted dollar index.
pub const USD_RET: &str = "usd_ret";
/// Monthly change of the 10-year yield, in decimal units.
pub const DGS10_CHG: &str = "dgs10_chg";
/// Monthly change of the high-yield spread, in decimal units.
pub const HY_OAS_CHG: &str = "hy_oas_chg";
/// Monthly return of the commodity index.
pub const CMDTY_RET: &str = "cmdty_ret";

/// Every macro proxy column in output order.
pub const MACRO_COLUMNS: [&str; 4] = [USD_RET, DGS10_CHG, HY_OAS_CHG, CMDTY_RET];

/// Daily inputs for the macro proxies.
#[derive(Debug, Clone, Default)]
pub struct MacroInputs {
    /// Dollar index level
    pub usd: Vec<(NaiveDate, f64)>,
    /// 10-year yield, percent
    pub dgs10: Vec<(NaiveDate, f64)>,
    /// High-yield OAS, percent
    pub hy_oas: Vec<(NaiveDate, f64)>,
    /// Commodity index closes, absent when the download failed
    pub commodity: Option<Vec<(NaiveDate, f64)>>,
}

/// Build the macro factor panel.
///
/// Each input is resampled to its last observation per month. Levels become
/// percentage changes, rates become first differences divided by 100. The
/// series are outer-joined and rows before `start` are dropped. A missing
/// commodity input yields an all-null `cmdty_ret` column.
pub fn build_macro_factors(inputs: &MacroInputs, start: Month) -> Result<MonthlyPanel> {
    let usd = MonthlySeries::from_daily_last(USD_RET, &inputs.usd).pct_change();
    let dgs10 = MonthlySeries::from_daily_last(DGS10_CHG, &inputs.dgs10)
        .diff()
        .scale(0.01);
    let hy = MonthlySeries::from_daily_last(HY_OAS_CHG, &inputs.hy_oas)
        .diff()
        .scale(0.01);

    let mut panel = MonthlyPanel::align(&[&usd, &dgs10, &hy], JoinKind::Outer)?;

    let cmdty = inputs
        .commodity
        .as_ref()
        .map(|closes| MonthlySeries::from_daily_last(CMDTY_RET, closes).pct_change());
    panel = match cmdty {
        Some(series) if !series.is_empty() => panel.join_series(&series, JoinKind::Outer)?,
        _ => {
            let months = panel.months()?;
            let empty = MonthlyPanel::from_columns(
                &months,
                vec![(CMDTY_RET.to_string(), vec![None; months.len()])],
            )?;
            panel.join(&empty, JoinKind::Left)?
        }
    };

    panel.between(Some(start), None)
}
