//! SQLite cache for downloaded payloads and daily closes.

use crate::error::{DataError, Result};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// SQLite cache for raw downloads.
///
/// Two tables are kept: `payloads` holds response bodies keyed by URL (Ken
/// French archives, FRED CSVs) and `quotes` holds adjusted daily closes keyed
/// by `(symbol, date)`.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    /// Raw bytes as downloaded
    pub body: Vec<u8>,
    /// When the payload was stored
    pub cached_at: DateTime<Utc>,
}

impl CachedPayload {
    /// Whether the payload was stored less than `max_age` ago.
    pub fn is_fresh(&self, max_age: TimeDelta) -> bool {
        Utc::now() - self.cached_at < max_age
    }
}

impl SqliteCache {
    /// Open (or create) a cache at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS payloads (
                url TEXT PRIMARY KEY,
                body BLOB NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        Ok(())
    }

    /// Look up a payload by URL.
    pub fn get_payload(&self, url: &str) -> Result<Option<CachedPayload>> {
        let row = self
            .conn
            .query_row(
                "SELECT body, cached_at FROM payloads WHERE url = ?1",
                params![url],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(body, cached_at)| {
            let cached_at = DateTime::parse_from_rfc3339(&cached_at)
                .map_err(|e| DataError::Parse(format!("Invalid cache timestamp: {}", e)))?
                .with_timezone(&Utc);
            Ok(CachedPayload { body, cached_at })
        })
        .transpose()
    }

    /// Store a payload, replacing any previous body for the URL.
    pub fn put_payload(&self, url: &str, body: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO payloads (url, body, cached_at) VALUES (?1, ?2, ?3)",
            params![url, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Whether the cache covers `[start, end]` for a symbol.
    ///
    /// Coverage means a close exists within a week of both ends of the range,
    /// since neither end needs to be a trading day.
    pub fn has_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let bounds: (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM quotes WHERE symbol = ?1",
            params![symbol],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (Some(first), Some(last)) = bounds else {
            return Ok(false);
        };
        let first = parse_date(&first)?;
        let last = parse_date(&last)?;
        Ok((first - start).num_days() <= 7 && (end - last).num_days() <= 7)
    }

    /// Cached closes for a symbol within `[start, end]`, ordered by date.
    pub fn get_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, adjusted_close FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![symbol, start.to_string(), end.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut closes = Vec::new();
        for row in rows {
            let (date, close) = row?;
            closes.push((parse_date(&date)?, close));
        }

        if closes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No cached data found".to_string(),
            });
        }
        Ok(closes)
    }

    /// Store daily closes for a symbol.
    pub fn put_quotes(&self, symbol: &str, closes: &[(NaiveDate, f64)]) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        for (date, close) in closes.iter().filter(|(_, c)| c.is_finite()) {
            tx.execute(
                "INSERT OR REPLACE INTO quotes (symbol, date, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![symbol, date.to_string(), close, cached_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM payloads", [])?;
        self.conn.execute("DELETE FROM quotes", [])?;
        Ok(())
    }

    /// Clear cached closes for a specific symbol.
    pub fn clear_symbol(&self, symbol: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let payloads: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM payloads", [], |row| row.get(0))?;

        let payload_bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM payloads",
            [],
            |row| row.get(0),
        )?;

        let quotes: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        Ok(CacheStats {
            payloads: payloads as usize,
            payload_bytes: payload_bytes as usize,
            total_quotes: quotes as usize,
            unique_symbols: symbols as usize,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DataError::Parse(format!("Invalid cached date {}: {}", s, e)))
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached payloads
    pub payloads: usize,
    /// Total size of cached payloads in bytes
    pub payload_bytes: usize,
    /// Total number of cached closes
    pub total_quotes: usize,
    /// Number of distinct symbols with closes
    pub unique_symbols: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_payload_round_trip() {
        let cache = SqliteCache::in_memory().unwrap();
        let url = "https://fred.stlouisfed.org/graph/fredgraph.csv?id=DGS10";
        assert!(cache.get_payload(url).unwrap().is_none());

        cache.put_payload(url, b"observation_date,DGS10\n").unwrap();
        cache.put_payload(url, b"observation_date,DGS10\n2024-01-01,4.0\n").unwrap();

        let payload = cache.get_payload(url).unwrap().unwrap();
        assert_eq!(payload.body, b"observation_date,DGS10\n2024-01-01,4.0\n".to_vec());
        assert!(payload.cached_at <= Utc::now());
        assert!(payload.is_fresh(TimeDelta::days(7)));
    }

    #[test]
    fn test_payload_freshness() {
        let stored = CachedPayload {
            body: Vec::new(),
            cached_at: Utc::now() - TimeDelta::days(10),
        };
        assert!(!stored.is_fresh(TimeDelta::days(7)));
        assert!(stored.is_fresh(TimeDelta::days(30)));
    }

    #[test]
    fn test_quote_operations() {
        let cache = SqliteCache::in_memory().unwrap();
        let closes = vec![
            (d(2024, 1, 2), 100.0),
            (d(2024, 1, 3), f64::NAN),
            (d(2024, 1, 31), 101.0),
        ];
        cache.put_quotes("SPMO", &closes).unwrap();

        let cached = cache.get_quotes("SPMO", d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        assert_eq!(cached, vec![(d(2024, 1, 2), 100.0), (d(2024, 1, 31), 101.0)]);

        assert!(cache.has_quotes("SPMO", d(2024, 1, 1), d(2024, 2, 2)).unwrap());
        assert!(!cache.has_quotes("SPMO", d(2023, 1, 1), d(2024, 2, 2)).unwrap());
        assert!(!cache.has_quotes("MTUM", d(2024, 1, 1), d(2024, 2, 2)).unwrap());

        let missing = cache.get_quotes("MTUM", d(2024, 1, 1), d(2024, 2, 1));
        assert!(matches!(missing, Err(DataError::MissingData { .. })));
    }

    #[test]
    fn test_cache_stats_and_clear() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_payload("a", &[1, 2, 3]).unwrap();
        cache.put_quotes("SPMO", &[(d(2024, 1, 2), 1.0)]).unwrap();
        cache.put_quotes("QMOM", &[(d(2024, 1, 2), 1.0), (d(2024, 1, 3), 1.1)]).unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(
            stats,
            CacheStats {
                payloads: 1,
                payload_bytes: 3,
                total_quotes: 3,
                unique_symbols: 2,
            }
        );

        cache.clear_symbol("QMOM").unwrap();
        assert_eq!(cache.get_stats().unwrap().total_quotes, 1);

        cache.clear_all().unwrap();
        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.payloads, 0);
        assert_eq!(stats.total_quotes, 0);
    }
}
