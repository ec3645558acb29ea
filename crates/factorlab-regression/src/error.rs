//! Regression errors.

use thiserror::Error;

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while fitting or testing a regression.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Regressor length differs from the response length
    #[error("Dimension mismatch for {name}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Offending column
        name: String,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Not enough observations for the number of parameters
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// The design matrix is rank deficient
    #[error("Singular design matrix: {0}")]
    Singular(String),

    /// NaN or infinite input
    #[error("Non-finite value in {0}")]
    NonFinite(String),

    /// Two regressors share a name
    #[error("Duplicate regressor: {0}")]
    DuplicateRegressor(String),

    /// Distribution construction failed
    #[error("Distribution error: {0}")]
    Distribution(String),
}
