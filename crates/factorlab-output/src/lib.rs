#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorlab/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod document;
pub mod error;
pub mod export;
pub mod markdown;
pub mod pdf;
pub mod table;

pub use chart::{Figure, Panel, PanelKind};
pub use document::{Block, ReportDocument, Span};
pub use error::{OutputError, Result};
pub use export::{ExportFormat, Exporter};
pub use table::{Cell, Table};
