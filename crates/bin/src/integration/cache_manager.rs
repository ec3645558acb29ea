//! Cache manager for downloaded data.
//!
//! Opens the SQLite download cache at a platform-specific default location.

use factorlab_data::cache::SqliteCache;
use factorlab_data::error::DataError;
use std::path::PathBuf;

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/factorlab/`
/// - macOS: `~/Library/Caches/factorlab/`
/// - Windows: `%LOCALAPPDATA%\factorlab\cache\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("factorlab")
}

/// Get the cache database path.
pub(crate) fn cache_path() -> PathBuf {
    default_cache_dir().join("factorlab.db")
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache() -> Result<SqliteCache, DataError> {
    let path = cache_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    SqliteCache::new(&path)
}
