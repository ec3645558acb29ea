//! Narrative reports assembled from study outputs.
//!
//! Reports read the CSV files the studies leave in the output directory, so
//! they can be rebuilt without refetching data. The global macro study
//! writes its own report alongside its tables.

pub mod q2;

pub use q2::{Q2Inputs, build_q2_report, write_q2_report};
