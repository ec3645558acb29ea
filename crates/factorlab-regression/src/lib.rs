#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorlab/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod diagnostics;
pub mod error;
pub mod hac;
pub mod linalg;
pub mod ols;
pub mod stats;
pub mod summary;

// Re-export main types
pub use diagnostics::{BreuschPagan, JarqueBera, ResidualDiagnostics};
pub use error::{RegressionError, Result};
pub use hac::{HacErrors, NeweyWestConfig};
pub use ols::{CONST, Coefficient, Ols, OlsFit};
pub use summary::ModelSummary;
