#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorlab/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod french;
pub mod fred;
pub mod http;
pub mod local;
pub mod macro_factors;
pub mod month;
pub mod panel;
pub mod series;
pub mod yahoo;

pub use error::{DataError, Result};
pub use http::HttpClient;
pub use month::Month;
pub use panel::{JoinKind, MonthlyPanel};
pub use series::MonthlySeries;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
