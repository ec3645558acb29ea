//! Daily adjusted closes from Yahoo Finance and their monthly returns.

use crate::error::{DataError, Result};
use crate::series::MonthlySeries;
use chrono::{DateTime, NaiveDate};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use yahoo_finance_api as yahoo;

/// Lower bound for a plausible monthly ETF return.
pub const RETURN_MIN: f64 = -0.5;

/// Upper bound for a plausible monthly ETF return.
pub const RETURN_MAX: f64 = 0.5;

/// Inclusive bounds outside of which monthly returns are treated as bad data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnBounds {
    /// Smallest accepted return
    pub min: f64,
    /// Largest accepted return
    pub max: f64,
}

impl Default for ReturnBounds {
    fn default() -> Self {
        Self {
            min: RETURN_MIN,
            max: RETURN_MAX,
        }
    }
}

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with the default delay of 500ms between requests.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(500))
    }

    /// Create a provider with a custom delay between requests.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Fetch adjusted daily closes for `symbol` over `[start, end]`.
    ///
    /// Returns `(date, adjusted close)` pairs in date order.
    pub async fn fetch_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        if symbol.trim().is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = to_offset_datetime(start)?;
        // The end bound is exclusive on the Yahoo side.
        let end_time = to_offset_datetime(end.succ_opt().unwrap_or(end))?;

        info!(symbol, %start, %end, "downloading daily prices");
        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        let mut closes = Vec::with_capacity(quotes.len());
        for q in &quotes {
            let ts = i64::try_from(q.timestamp)
                .map_err(|e| DataError::TimeConversion(e.to_string()))?;
            let date = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| DataError::TimeConversion(format!("Invalid timestamp {}", ts)))?
                .date_naive();
            if q.adjclose.is_finite() {
                closes.push((date, q.adjclose));
            }
        }
        closes.sort_by_key(|(date, _)| *date);
        closes.dedup_by_key(|(date, _)| *date);

        if closes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }
        debug!(symbol, rows = closes.len(), "received daily closes");

        sleep(self.rate_limit_delay).await;

        Ok(closes)
    }
}

fn to_offset_datetime(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let ts = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DataError::TimeConversion(format!("Invalid date {}", date)))?
        .and_utc()
        .timestamp();
    time::OffsetDateTime::from_unix_timestamp(ts).map_err(|e| DataError::TimeConversion(e.to_string()))
}

/// Monthly simple returns from daily closes.
///
/// Closes are resampled to the last observation of each month, converted to
/// percentage changes, and months whose return falls outside `bounds` are
/// dropped.
pub fn monthly_returns(
    symbol: &str,
    closes: &[(NaiveDate, f64)],
    bounds: ReturnBounds,
) -> MonthlySeries {
    let returns = MonthlySeries::from_daily_last(symbol, closes).pct_change();
    let kept = returns.clamp_filter(bounds.min, bounds.max);
    if kept.len() < returns.len() {
        debug!(
            symbol,
            dropped = returns.len() - kept.len(),
            "dropped out-of-bounds monthly returns"
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::month::Month;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_returns_from_month_end_closes() {
        let closes = vec![
            (d(2023, 12, 28), 99.0),
            (d(2023, 12, 29), 100.0),
            (d(2024, 1, 15), 104.0),
            (d(2024, 1, 31), 110.0),
            (d(2024, 2, 29), 99.0),
        ];
        let r = monthly_returns("SPMO", &closes, ReturnBounds::default());
        assert_eq!(r.name(), "SPMO");
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r.get(Month::new(2024, 1).unwrap()).unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(r.get(Month::new(2024, 2).unwrap()).unwrap(), -0.10, epsilon = 1e-12);
    }

    #[test]
    fn monthly_returns_drop_outliers() {
        let closes = vec![
            (d(2024, 1, 31), 100.0),
            (d(2024, 2, 29), 200.0),
            (d(2024, 3, 29), 210.0),
        ];
        let r = monthly_returns("QMOM", &closes, ReturnBounds::default());
        assert_eq!(r.months(), vec![Month::new(2024, 3).unwrap()]);
    }

    #[tokio::test]
    async fn test_invalid_date_range() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider
            .fetch_daily_closes("SPMO", d(2024, 2, 1), d(2024, 1, 1))
            .await;
        assert!(matches!(result, Err(DataError::InvalidDateRange { .. })));
    }

    #[tokio::test]
    async fn test_empty_symbol() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider
            .fetch_daily_closes("  ", d(2024, 1, 1), d(2024, 2, 1))
            .await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_daily_closes() {
        let provider = YahooQuoteProvider::new().unwrap();
        let closes = provider
            .fetch_daily_closes("SPMO", d(2024, 1, 1), d(2024, 3, 31))
            .await
            .unwrap();
        assert!(closes.len() > 40);
        assert!(closes.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
