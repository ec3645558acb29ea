//! Error types for output operations.

use thiserror::Error;

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Errors that can occur while writing tables, reports and charts.
#[derive(Debug, Error)]
pub enum OutputError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A row does not have one cell per header.
    #[error("Row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based row index
        row: usize,
        /// Number of headers
        expected: usize,
        /// Number of cells supplied
        actual: usize,
    },

    /// Column lookup failed.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// PDF rendering error.
    #[error("PDF error: {0}")]
    Pdf(String),
}

impl From<printpdf::Error> for OutputError {
    fn from(err: printpdf::Error) -> Self {
        Self::Pdf(err.to_string())
    }
}
