//! Local download cache.

pub mod sqlite;

pub use sqlite::{CacheStats, SqliteCache};
