#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorlab/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod methodology;
pub mod reports;
pub mod studies;

// Re-export main types from sub-crates
pub use factorlab_data as data;
pub use factorlab_output as output;
pub use factorlab_regression as regression;

pub use config::{EtfSpec, MacroConfig, StudyConfig};
pub use error::{Result, StudyError};

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
