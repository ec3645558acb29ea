//! FRED (Federal Reserve Economic Data) series download.

use crate::error::{DataError, Result};
use crate::http::HttpClient;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Base URL of the FRED graph CSV endpoint.
pub const FRED_CSV_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

/// Broad trade-weighted US dollar index.
pub const SERIES_USD: &str = "DTWEXBGS";

/// 10-year Treasury constant maturity yield, percent.
pub const SERIES_DGS10: &str = "DGS10";

/// ICE BofA US High Yield option-adjusted spread, percent.
pub const SERIES_HY_OAS: &str = "BAMLH0A0HYM2";

/// One FRED observation. `value` is `None` where FRED reports `.` or blank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Observation date
    pub date: NaiveDate,
    /// Observed value
    pub value: Option<f64>,
}

/// Download URL for a series.
pub fn series_url(series_id: &str) -> String {
    format!("{}?id={}", FRED_CSV_URL, series_id)
}

/// Client for FRED CSV downloads.
#[derive(Debug, Clone)]
pub struct FredClient {
    http: HttpClient,
}

impl FredClient {
    /// Create a client on top of a shared HTTP client.
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Fetch every observation of `series_id`.
    pub async fn fetch_series(&self, series_id: &str) -> Result<Vec<Observation>> {
        if series_id.trim().is_empty() {
            return Err(DataError::InvalidSymbol("Empty FRED series id".to_string()));
        }
        let body = self.http.get_bytes(&series_url(series_id)).await?;
        let observations = parse_fred_csv(&body)?;
        info!(series_id, rows = observations.len(), "FRED series loaded");
        Ok(observations)
    }
}

/// Parse a two-column FRED CSV (`date,value` with a header row).
///
/// Rows whose date does not parse are dropped; non-numeric values are kept as
/// missing. The result is sorted by date.
pub fn parse_fred_csv(body: &[u8]) -> Result<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let mut observations = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        let date = record
            .get(0)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let Some(date) = date else {
            skipped += 1;
            continue;
        };
        let value = record
            .get(1)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        observations.push(Observation { date, value });
    }

    if skipped > 0 {
        debug!(skipped, "dropped FRED rows with unparseable dates");
    }
    observations.sort_by_key(|o| o.date);
    Ok(observations)
}

/// Observations with a value, as `(date, value)` pairs.
pub fn present_values(observations: &[Observation]) -> Vec<(NaiveDate, f64)> {
    observations
        .iter()
        .filter_map(|o| o.value.map(|v| (o.date, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_missing_and_bad_dates() {
        let body = b"observation_date,DGS10\n2024-01-03,3.91\n2024-01-01,.\nnot-a-date,4.0\n2024-01-02,\n";
        let obs = parse_fred_csv(body).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(obs[0].value, None);
        assert_eq!(obs[1].value, None);
        assert_eq!(obs[2].value, Some(3.91));

        let present = present_values(&obs);
        assert_eq!(present, vec![(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 3.91)]);
    }

    #[test]
    fn builds_series_url() {
        assert_eq!(
            series_url("DTWEXBGS"),
            "https://fred.stlouisfed.org/graph/fredgraph.csv?id=DTWEXBGS"
        );
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_series() {
        let client = FredClient::new(HttpClient::new().unwrap());
        let obs = client.fetch_series(SERIES_DGS10).await.unwrap();
        assert!(!obs.is_empty());
    }
}
