//! Error types for the studies.

use thiserror::Error;

/// Result type for study operations.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Errors that can occur while configuring or running a study.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Data loading or alignment error
    #[error("Data error: {0}")]
    Data(#[from] factorlab_data::DataError),

    /// Regression error
    #[error("Regression error: {0}")]
    Regression(#[from] factorlab_regression::RegressionError),

    /// Output error
    #[error("Output error: {0}")]
    Output(#[from] factorlab_output::OutputError),

    /// Configuration error
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Not enough aligned observations to run a study
    #[error("Insufficient data for {study}: {reason}")]
    InsufficientData {
        /// Study name
        study: String,
        /// What was missing
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudyError {
    pub(crate) fn insufficient(study: &str, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            study: study.to_string(),
            reason: reason.into(),
        }
    }
}
