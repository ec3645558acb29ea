//! Yahoo Finance price history.

pub mod quotes;

pub use quotes::{RETURN_MAX, RETURN_MIN, ReturnBounds, YahooQuoteProvider, monthly_returns};
