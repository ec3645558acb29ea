//! Kenneth R. French Data Library.
//!
//! The library publishes each dataset as a ZIP archive holding a single CSV
//! file with a free-text preamble, one or more data sections and a copyright
//! footer. Values are monthly percentages keyed by `YYYYMM`.

pub mod client;
pub mod datasets;
pub mod deciles;
pub mod parser;

pub use client::{FrenchClient, unzip_first_entry};
pub use datasets::{FF5_COLUMNS, MOMENTUM_COLUMNS, URL_DECILES, URL_FF5, URL_UMD};
pub use deciles::{DecilePortfolios, Weighting, parse_deciles};
pub use parser::{FactorTable, parse_factor_table};
