//! Integration between the command line and the data sources.
//!
//! This module fetches (and caches) the factor files, ETF prices and macro
//! series the studies need, and loads the local inputs of the global macro
//! study.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
