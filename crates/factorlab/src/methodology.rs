//! Static methodology text for the ETF versus academic momentum comparison.
//!
//! The ETF entries summarise the Invesco prospectus and the S&P index
//! methodology; check them against the latest prospectus before quoting.

use factorlab_output::{Cell, Result, Table};

/// Methodology of the S&P 500 Momentum Index tracked by SPMO.
pub const SPMO_METHODOLOGY: &[(&str, &str)] = &[
    ("Source", "Invesco SPMO Prospectus / S&P 500 Momentum Index methodology"),
    ("Index Name", "S&P 500 Momentum Index"),
    ("Selection Criteria", "Highest momentum score from S&P 500 constituents"),
    ("Number of Holdings", "Approximately 100 stocks"),
    ("Momentum Definition", "12-month price change (risk-adjusted); momentum score"),
    ("Weighting Method", "Momentum-score weighted, cap per security (e.g. 3%)"),
    ("Rebalancing", "Semi-annually (e.g. May and November)"),
    ("Skip Month", "Check prospectus (often 12-month raw or risk-adjusted)"),
];

/// Methodology of the Fama-French UMD factor.
pub const UMD_METHODOLOGY: &[(&str, &str)] = &[
    ("Source", "Fama-French, Ken French Data Library"),
    ("Universe", "All NYSE, AMEX, NASDAQ stocks"),
    ("Number of Stocks", "~300–400 per leg (600–800 total)"),
    ("Formation Period", "11 months (t-12 to t-2, skip t-1)"),
    ("Skip Month", "Yes (skip month t-1)"),
    ("Ranking", "Deciles by past return"),
    ("Long Leg", "Top decile (winners)"),
    ("Short Leg", "Bottom decile (losers)"),
    ("Weighting", "Equal-weighted within each leg"),
    ("Construction", "UMD = Winners − Losers"),
    ("Rebalancing", "Monthly"),
    ("Market Exposure", "Market-neutral (~0)"),
];

/// Side-by-side comparison rows: feature, UMD, SPMO.
pub const COMPARISON: &[(&str, &str, &str)] = &[
    ("Universe", "All US stocks (~3000)", "S&P 500 only (~500)"),
    ("Market Cap", "All caps", "Large cap only"),
    ("Selection", "Top/Bottom 10% by return", "Top by momentum score"),
    ("Number of Stocks", "~300–400 per leg", "~100 stocks"),
    ("Long/Short", "Long-Short (market neutral)", "Long-only"),
    ("Lookback", "11 months (t-12 to t-2)", "12 months (verify prospectus)"),
    ("Skip Recent Month?", "Yes", "Verify prospectus"),
    ("Weighting", "Equal-weighted", "Momentum-score weighted, cap"),
    ("Rebalancing", "Monthly", "Semi-annually"),
    ("Market Exposure", "~0", "~1.0"),
];

/// Fund objective as stated by the issuer.
pub const SPMO_QUOTE: &str = "The Invesco S&P 500 Momentum ETF seeks to track the investment \
results (before fees and expenses) of the S&P 500 Momentum Index. The Index measures the \
performance of securities in the S&P 500 that exhibit the highest momentum characteristics based \
on price performance and risk. Momentum is measured using a momentum score (e.g. 12-month price \
change, risk-adjusted). The Index typically consists of approximately 100 stocks, reconstituted \
and rebalanced semi-annually, with weights by momentum score and a cap per security (e.g. 3%).";

/// Header of the comparison table.
pub const COMPARISON_HEADERS: [&str; 3] = ["Feature", "UMD (Fama-French)", "SPMO"];

/// Methodology entries as a `Metric,Value` table.
pub fn key_value_table(entries: &[(&str, &str)]) -> Table {
    Table::metrics(
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), Cell::from(*value))),
    )
}

/// The feature comparison as a table.
///
/// # Errors
///
/// Never fails for the built-in rows; the error type comes from
/// [`Table::push_row`].
pub fn comparison_table() -> Result<Table> {
    let mut table = Table::new(COMPARISON_HEADERS);
    for (feature, umd, spmo) in COMPARISON {
        table.push_row(vec![
            Cell::from(*feature),
            Cell::from(*umd),
            Cell::from(*spmo),
        ])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_table_has_every_feature() {
        let table = comparison_table().unwrap();
        assert_eq!(table.headers(), &COMPARISON_HEADERS.map(String::from));
        assert_eq!(table.len(), 10);
        assert_eq!(
            table.lookup("Feature", "Long/Short", "SPMO"),
            Some(&Cell::from("Long-only"))
        );
    }

    #[test]
    fn methodology_tables_keep_order() {
        let table = key_value_table(UMD_METHODOLOGY);
        assert_eq!(table.len(), UMD_METHODOLOGY.len());
        assert_eq!(table.metric("Source"), Some(&Cell::from("Fama-French, Ken French Data Library")));
        assert_eq!(key_value_table(SPMO_METHODOLOGY).len(), 8);
    }

    #[test]
    fn quote_is_ascii() {
        assert!(SPMO_QUOTE.is_ascii());
    }
}
