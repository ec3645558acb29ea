//! Momentum decile portfolios (10 portfolios formed on prior 12-2 return).

use super::parser::{FactorTable, fields, parse_factor_table, row_month};
use crate::error::{DataError, Result};
use crate::series::MonthlySeries;
use tracing::{debug, warn};

const DECILE_COLUMNS: [&str; 10] = ["D1", "D2", "D3", "D4", "D5", "D6", "D7", "D8", "D9", "D10"];

/// Portfolio weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Value weighted
    Value,
    /// Equal weighted
    Equal,
}

impl Weighting {
    /// Suffix used in series names (`VW` / `EW`).
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Value => "VW",
            Self::Equal => "EW",
        }
    }
}

/// Value- and equal-weighted decile returns. D1 holds the past losers and
/// D10 the past winners.
#[derive(Debug, Clone)]
pub struct DecilePortfolios {
    value: FactorTable,
    equal: Option<FactorTable>,
}

impl DecilePortfolios {
    fn table(&self, weighting: Weighting) -> Option<&FactorTable> {
        match weighting {
            Weighting::Value => Some(&self.value),
            Weighting::Equal => self.equal.as_ref(),
        }
    }

    /// Whether equal-weighted returns were found in the file.
    pub const fn has_equal_weighted(&self) -> bool {
        self.equal.is_some()
    }

    /// Returns of decile `i` (1-10), named e.g. `VW_D3`.
    pub fn decile(&self, weighting: Weighting, i: usize) -> Result<MonthlySeries> {
        if !(1..=10).contains(&i) {
            return Err(DataError::ColumnNotFound(format!("D{}", i)));
        }
        let table = self.table(weighting).ok_or_else(|| DataError::MissingData {
            symbol: "momentum deciles".to_string(),
            reason: format!("no {} section", weighting.suffix()),
        })?;
        Ok(table
            .series(DECILE_COLUMNS[i - 1])?
            .renamed(format!("{}_D{}", weighting.suffix(), i)))
    }

    /// Top decile (D10).
    pub fn winners(&self, weighting: Weighting) -> Result<MonthlySeries> {
        Ok(self
            .decile(weighting, 10)?
            .renamed(format!("Winners_{}", weighting.suffix())))
    }

    /// Bottom decile (D1).
    pub fn losers(&self, weighting: Weighting) -> Result<MonthlySeries> {
        Ok(self
            .decile(weighting, 1)?
            .renamed(format!("Losers_{}", weighting.suffix())))
    }

    /// Winners minus losers (D10 - D1), named `MomLS_VW` / `MomLS_EW`.
    pub fn long_short(&self, weighting: Weighting) -> Result<MonthlySeries> {
        let winners = self.decile(weighting, 10)?;
        let losers = self.decile(weighting, 1)?;
        Ok(winners.minus(&losers, format!("MomLS_{}", weighting.suffix())))
    }
}

/// Parse a decile portfolio file.
///
/// The monthly value- and equal-weighted sections are located by their
/// `... Weight... Returns -- Monthly` headers; when a header repeats, the
/// last occurrence wins. When either header is missing
/// the first monthly block is read instead: rows with at least 21 fields
/// carry value weights in columns 1-10 and equal weights in 11-20, shorter
/// rows carry value weights only.
pub fn parse_deciles(text: &str) -> Result<DecilePortfolios> {
    let lines: Vec<&str> = text.lines().collect();
    let vw_start = find_section(&lines, "Value Weight");
    let ew_start = find_section(&lines, "Equal Weight");

    if let (Some(vw), Some(ew)) = (vw_start, ew_start) {
        let value = parse_factor_table(&lines[vw..].join("\n"), &DECILE_COLUMNS);
        let equal = parse_factor_table(&lines[ew..].join("\n"), &DECILE_COLUMNS);
        if let (Ok(value), Ok(equal)) = (value, equal) {
            debug!(rows = value.len(), "parsed VW and EW decile sections");
            return Ok(DecilePortfolios {
                value,
                equal: Some(equal),
            });
        }
        warn!("decile section headers found but sections did not parse; reading first block");
    }

    parse_combined_block(&lines)
}

fn find_section(lines: &[&str], weighting: &str) -> Option<usize> {
    lines
        .iter()
        .rposition(|l| l.contains(weighting) && l.contains("Returns") && l.contains("Monthly"))
        .map(|i| i + 1)
}

fn parse_combined_block(lines: &[&str]) -> Result<DecilePortfolios> {
    let mut vw_rows = Vec::new();
    let mut ew_rows = Vec::new();
    let mut started = false;

    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let parts = fields(line);
        let Some(_) = row_month(&parts) else {
            if started {
                break;
            }
            continue;
        };
        started = true;
        if parts.len() >= 21 {
            vw_rows.push(parts[..11].join(","));
            ew_rows.push(std::iter::once(parts[0]).chain(parts[11..21].iter().copied()).collect::<Vec<_>>().join(","));
        } else if parts.len() >= 11 {
            vw_rows.push(parts[..11].join(","));
        }
    }

    if vw_rows.is_empty() {
        return Err(DataError::Parse("Could not parse decile file".to_string()));
    }

    let value = parse_factor_table(&vw_rows.join("\n"), &DECILE_COLUMNS)?;
    let equal = if ew_rows.len() == vw_rows.len() {
        Some(parse_factor_table(&ew_rows.join("\n"), &DECILE_COLUMNS)?)
    } else {
        if !ew_rows.is_empty() {
            warn!("equal-weighted columns present on only some rows; ignoring them");
        }
        None
    };

    Ok(DecilePortfolios { value, equal })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::month::Month;
    use approx::assert_relative_eq;

    const SECTIONED: &str = "This file was created by CMPT_ME_PRIOR_RETS using the 202412 CRSP database.
  Average Value Weighted Returns -- Monthly
,Lo PRIOR,PRIOR 2,PRIOR 3,PRIOR 4,PRIOR 5,PRIOR 6,PRIOR 7,PRIOR 8,PRIOR 9,Hi PRIOR
202401,-1.00,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,4.00
202402,2.00,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,3.00

  Average Equal Weighted Returns -- Monthly
,Lo PRIOR,PRIOR 2,PRIOR 3,PRIOR 4,PRIOR 5,PRIOR 6,PRIOR 7,PRIOR 8,PRIOR 9,Hi PRIOR
202401,-2.00,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,5.00
202402,1.00,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,-99.99

  Average Value Weighted Returns -- Annual
,Lo PRIOR,PRIOR 2,PRIOR 3,PRIOR 4,PRIOR 5,PRIOR 6,PRIOR 7,PRIOR 8,PRIOR 9,Hi PRIOR
2024,1,2,3,4,5,6,7,8,9,10
";

    #[test]
    fn sectioned_file() {
        let deciles = parse_deciles(SECTIONED).unwrap();
        assert!(deciles.has_equal_weighted());

        let jan = Month::new(2024, 1).unwrap();
        let ls_vw = deciles.long_short(Weighting::Value).unwrap();
        assert_eq!(ls_vw.name(), "MomLS_VW");
        assert_relative_eq!(ls_vw.get(jan).unwrap(), 0.05, epsilon = 1e-12);

        let winners_ew = deciles.winners(Weighting::Equal).unwrap();
        assert_eq!(winners_ew.name(), "Winners_EW");
        assert_eq!(winners_ew.len(), 1);
        assert_relative_eq!(winners_ew.get(jan).unwrap(), 0.05, epsilon = 1e-12);

        let losers_vw = deciles.losers(Weighting::Value).unwrap();
        assert_relative_eq!(losers_vw.get(Month::new(2024, 2).unwrap()).unwrap(), 0.02, epsilon = 1e-12);
        // missing EW D10 removes the month from the long-short series
        assert_eq!(deciles.long_short(Weighting::Equal).unwrap().len(), 1);
    }

    #[test]
    fn repeated_header_uses_last_section() {
        let stale = ["9.00"; 10].join(",");
        let text = format!(
            "  Average Value Weighted Returns -- Monthly\n,Lo PRIOR,Hi PRIOR\n202401,{stale}\n\n{SECTIONED}"
        );
        let deciles = parse_deciles(&text).unwrap();
        let jan = Month::new(2024, 1).unwrap();
        assert_relative_eq!(
            deciles.winners(Weighting::Value).unwrap().get(jan).unwrap(),
            0.04,
            epsilon = 1e-12
        );
        assert_eq!(deciles.losers(Weighting::Value).unwrap().len(), 2);
    }

    #[test]
    fn combined_rows_without_headers() {
        let row = |date: &str| {
            let vw: Vec<String> = (1..=10).map(|i| format!("{}", i)).collect();
            let ew: Vec<String> = (1..=10).map(|i| format!("{}", i * 2)).collect();
            format!("{},{},{}", date, vw.join(","), ew.join(","))
        };
        let text = format!("preamble\n{}\n{}\n\nfooter\n", row("202001"), row("202002"));
        let deciles = parse_deciles(&text).unwrap();
        assert!(deciles.has_equal_weighted());
        let d10_ew = deciles.decile(Weighting::Equal, 10).unwrap();
        assert_eq!(d10_ew.name(), "EW_D10");
        assert_relative_eq!(d10_ew.values()[0], 0.20, epsilon = 1e-12);
        assert_relative_eq!(deciles.long_short(Weighting::Value).unwrap().values()[1], 0.09, epsilon = 1e-12);
    }

    #[test]
    fn value_weighted_only() {
        let text = "202001,1,2,3,4,5,6,7,8,9,10\n";
        let deciles = parse_deciles(text).unwrap();
        assert!(!deciles.has_equal_weighted());
        assert!(deciles.winners(Weighting::Equal).is_err());
        assert!(deciles.decile(Weighting::Value, 11).is_err());
    }

    #[test]
    fn unparseable_file() {
        assert!(parse_deciles("nothing here\n202001,1,2\n").is_err());
    }
}
