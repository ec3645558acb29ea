//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Yahoo Finance API error
    #[error("Yahoo Finance API error: {0}")]
    YahooApi(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Missing data
    #[error("Missing data for {symbol}: {reason}")]
    MissingData {
        /// Symbol or dataset that was queried
        symbol: String,
        /// Reason for missing data
        reason: String,
    },

    /// Column lookup failed on a monthly panel
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Two panels carry the same value column
    #[error("Duplicate column in join: {0}")]
    DuplicateColumn(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Time conversion error
    #[error("Time conversion error: {0}")]
    TimeConversion(String),

    /// Invalid symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// ZIP archive error
    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excel workbook error
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<yahoo_finance_api::YahooError> for DataError {
    fn from(err: yahoo_finance_api::YahooError) -> Self {
        Self::YahooApi(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DataError::HttpStatus {
            url: "https://example.com/a.zip".to_string(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("a.zip"));

        let err = DataError::MissingData {
            symbol: "SPMO".to_string(),
            reason: "no rows".to_string(),
        };
        assert_eq!(err.to_string(), "Missing data for SPMO: no rows");
    }
}
