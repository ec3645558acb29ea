//! Data pipeline for fetching the study inputs.
//!
//! Every download goes through the SQLite cache: archive and CSV bodies are
//! stored by URL, daily closes by symbol and date. Stored bodies are reused
//! for [`PAYLOAD_MAX_AGE_DAYS`] days. A cache that cannot be opened or read
//! is skipped with a warning rather than failing the run.

use super::cache_manager;
use chrono::{NaiveDate, TimeDelta};
use factorlab::studies::UMD;
use factorlab::studies::global_macro::{ExternalFactors, GlobalMacroData, files as macro_files};
use factorlab::{EtfSpec, StudyConfig};
use factorlab_data::cache::SqliteCache;
use factorlab_data::error::DataError;
use factorlab_data::french::{
    DecilePortfolios, FF5_COLUMNS, FactorTable, MOMENTUM_COLUMNS, parse_deciles, parse_factor_table,
    unzip_first_entry,
};
use factorlab_data::fred::{parse_fred_csv, present_values, series_url};
use factorlab_data::local::{load_daily_factors_monthly, load_fund_returns, resolve_input};
use factorlab_data::macro_factors::{MacroInputs, build_macro_factors};
use factorlab_data::yahoo::{YahooQuoteProvider, monthly_returns};
use factorlab_data::{HttpClient, MonthlyPanel, MonthlySeries};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Download, cache or parse error.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] DataError),
    /// A local input file could not be found.
    #[error("Missing input: {0}")]
    MissingInput(String),
}

/// Configuration for data fetching.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to force refresh (ignore cached entries, still store new ones).
    pub force_refresh: bool,
    /// Cached downloads older than this are fetched again.
    pub payload_max_age: TimeDelta,
}

/// Days a cached Ken French or FRED download is reused.
pub(crate) const PAYLOAD_MAX_AGE_DAYS: i64 = 7;

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            payload_max_age: TimeDelta::days(PAYLOAD_MAX_AGE_DAYS),
        }
    }
}

/// Number of ETF downloads in flight at once.
const DEFAULT_CONCURRENCY: usize = 4;

/// Spinner shown while a single download runs.
pub(crate) fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Fetches and caches everything the studies read.
#[derive(Debug)]
pub(crate) struct DataPipeline {
    config: StudyConfig,
    fetch: FetchConfig,
    http: HttpClient,
    yahoo: YahooQuoteProvider,
    cache: Option<SqliteCache>,
}

impl DataPipeline {
    /// Create a pipeline for `config`.
    pub(crate) fn new(config: &StudyConfig, fetch: FetchConfig) -> Result<Self, DataPipelineError> {
        let cache = if fetch.use_cache {
            match cache_manager::open_cache() {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!(error = %e, "cache unavailable, downloading everything");
                    None
                }
            }
        } else {
            None
        };
        Ok(Self {
            config: config.clone(),
            fetch,
            http: HttpClient::with_timeout(config.request_timeout())?,
            yahoo: YahooQuoteProvider::new()?,
            cache,
        })
    }

    const fn read_cache(&self) -> Option<&SqliteCache> {
        if self.fetch.force_refresh {
            None
        } else {
            self.cache.as_ref()
        }
    }

    /// Fresh cached body for `url`. Read failures count as a miss.
    fn cached_payload(&self, url: &str) -> Option<Vec<u8>> {
        let cache = self.read_cache()?;
        match cache.get_payload(url) {
            Ok(Some(hit)) if hit.is_fresh(self.fetch.payload_max_age) => {
                debug!(url, cached_at = %hit.cached_at, "payload from cache");
                Some(hit.body)
            }
            Ok(Some(hit)) => {
                debug!(url, cached_at = %hit.cached_at, "cached payload is stale");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(url, error = %e, "cache read failed, downloading");
                None
            }
        }
    }

    /// Cached closes covering `[start, end]`. Read failures count as a miss.
    fn cached_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Vec<(NaiveDate, f64)>> {
        let cache = self.read_cache()?;
        let covered = cache.has_quotes(symbol, start, end).and_then(|covered| {
            if covered {
                cache.get_quotes(symbol, start, end).map(Some)
            } else {
                Ok(None)
            }
        });
        match covered {
            Ok(Some(closes)) if !closes.is_empty() => {
                debug!(symbol, days = closes.len(), "closes from cache");
                Some(closes)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(symbol, error = %e, "cache read failed, downloading");
                None
            }
        }
    }

    /// Response body for `url`, from the cache when present and fresh.
    async fn payload(&self, url: &str) -> Result<Vec<u8>, DataPipelineError> {
        if let Some(body) = self.cached_payload(url) {
            return Ok(body);
        }

        let body = self.http.get_bytes(url).await?;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.put_payload(url, &body)
        {
            warn!(url, error = %e, "failed to cache payload");
        }
        Ok(body)
    }

    async fn french_text(&self, url: &str) -> Result<String, DataPipelineError> {
        let bytes = self.payload(url).await?;
        Ok(unzip_first_entry(&bytes)?)
    }

    /// Monthly UMD momentum factor, as a decimal return.
    pub(crate) async fn umd(&self) -> Result<MonthlySeries, DataPipelineError> {
        let text = self.french_text(&self.config.french.umd).await?;
        let table = parse_factor_table(&text, &MOMENTUM_COLUMNS)?;
        info!(months = table.len(), "UMD factor loaded");
        Ok(table.series(UMD)?)
    }

    /// Monthly Fama-French five factors and the risk-free rate.
    pub(crate) async fn ff5(&self) -> Result<FactorTable, DataPipelineError> {
        let text = self.french_text(&self.config.french.ff5).await?;
        let table = parse_factor_table(&text, &FF5_COLUMNS)?;
        info!(months = table.len(), "FF5 factors loaded");
        Ok(table)
    }

    /// Momentum decile portfolios.
    pub(crate) async fn deciles(&self) -> Result<DecilePortfolios, DataPipelineError> {
        let text = self.french_text(&self.config.french.deciles).await?;
        Ok(parse_deciles(&text)?)
    }

    /// Adjusted daily closes over `[start, end]`, cache first.
    async fn daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DataPipelineError> {
        if let Some(closes) = self.cached_closes(symbol, start, end) {
            return Ok(closes);
        }

        let closes = self.yahoo.fetch_daily_closes(symbol, start, end).await?;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.put_quotes(symbol, &closes)
        {
            warn!(symbol, error = %e, "failed to cache quotes");
        }
        Ok(closes)
    }

    /// Monthly returns of an ETF over the configured window.
    pub(crate) async fn etf_returns(&self, ticker: &str) -> Result<MonthlySeries, DataPipelineError> {
        let closes = self
            .daily_closes(ticker, self.config.start_date, self.config.end_date())
            .await?;
        let returns = monthly_returns(ticker, &closes, self.config.return_bounds());
        if returns.is_empty() {
            return Err(DataError::MissingData {
                symbol: ticker.to_string(),
                reason: "no monthly returns in range".to_string(),
            }
            .into());
        }
        info!(ticker, months = returns.len(), "ETF returns loaded");
        Ok(returns)
    }

    /// Monthly returns for several ETFs, in input order. Failures are kept
    /// per ETF so one bad ticker does not stop the others.
    pub(crate) async fn etf_returns_many(
        &self,
        etfs: &[EtfSpec],
    ) -> Vec<(EtfSpec, Result<MonthlySeries, DataPipelineError>)> {
        let pb = ProgressBar::new(etfs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid template"),
        );
        pb.set_message(format!("Fetching {} ETFs ({DEFAULT_CONCURRENCY} concurrent)...", etfs.len()));

        let results: Vec<_> = stream::iter(etfs.iter().cloned())
            .map(|etf| async move {
                let returns = self.etf_returns(&etf.ticker).await;
                (etf, returns)
            })
            .buffered(DEFAULT_CONCURRENCY)
            .inspect(|_| pb.inc(1))
            .collect()
            .await;

        pb.finish_and_clear();
        results
    }

    /// Daily values of a FRED series, missing observations dropped.
    async fn fred_series(&self, series_id: &str) -> Result<Vec<(NaiveDate, f64)>, DataPipelineError> {
        let body = self.payload(&series_url(series_id)).await?;
        let values = present_values(&parse_fred_csv(&body)?);
        debug!(series_id, days = values.len(), "FRED series loaded");
        Ok(values)
    }

    /// External macro factors: dollar, rates, credit and commodities.
    ///
    /// The commodity index is optional: when its download fails the
    /// `cmdty_ret` column is left empty.
    pub(crate) async fn macro_factors(&self) -> Result<MonthlyPanel, DataPipelineError> {
        let macro_study = &self.config.macro_study;
        let (usd, dgs10, hy_oas) = futures::try_join!(
            self.fred_series(&macro_study.usd_series),
            self.fred_series(&macro_study.dgs10_series),
            self.fred_series(&macro_study.hy_oas_series),
        )?;

        let commodity = match self
            .daily_closes(
                &macro_study.commodity_symbol,
                macro_study.external_start,
                self.config.end_date(),
            )
            .await
        {
            Ok(closes) if !closes.is_empty() => Some(closes),
            Ok(_) => {
                warn!(symbol = %macro_study.commodity_symbol, "no commodity closes, cmdty_ret left empty");
                None
            }
            Err(e) => {
                warn!(symbol = %macro_study.commodity_symbol, error = %e, "commodity download failed, cmdty_ret left empty");
                None
            }
        };

        let inputs = MacroInputs {
            usd,
            dgs10,
            hy_oas,
            commodity,
        };
        Ok(build_macro_factors(&inputs, macro_study.external_start_month())?)
    }

    /// Monthly returns of the live ETF since its launch.
    pub(crate) async fn live_returns(&self) -> Result<MonthlySeries, DataPipelineError> {
        let ticker = &self.config.macro_study.live_ticker;
        let closes = self
            .daily_closes(ticker, self.config.macro_study.live_start, self.config.end_date())
            .await?;
        let returns = MonthlySeries::from_daily_last(ticker.as_str(), &closes).pct_change();
        if returns.is_empty() {
            return Err(DataError::MissingData {
                symbol: ticker.clone(),
                reason: "no monthly returns since launch".to_string(),
            }
            .into());
        }
        Ok(returns)
    }

    fn local_input(&self, file: &str) -> Result<PathBuf, DataPipelineError> {
        let macro_study = &self.config.macro_study;
        resolve_input(file, &macro_study.data_dir, &macro_study.code_dir).ok_or_else(|| {
            DataPipelineError::MissingInput(format!(
                "{file} not found in {} or {}",
                macro_study.data_dir.display(),
                macro_study.code_dir.display()
            ))
        })
    }

    /// Fund returns and monthly FF5 factors from the local files.
    pub(crate) fn load_local(&self) -> Result<(MonthlySeries, MonthlyPanel), DataPipelineError> {
        let fund_path = self.local_input(&self.config.macro_study.fund_file)?;
        let ff5_path = self.local_input(&self.config.macro_study.ff5_file)?;
        let fund = load_fund_returns(&fund_path)?;
        let ff5 = load_daily_factors_monthly(&ff5_path)?;
        Ok((fund, ff5))
    }

    /// Everything the global macro study reads.
    ///
    /// Local files are required. The external factors fall back to the
    /// copy saved by an earlier run, and a failed live download is carried
    /// as a message.
    pub(crate) async fn global_macro_data(&self) -> Result<GlobalMacroData, DataPipelineError> {
        let (fund, ff5) = self.load_local()?;

        let saved = self
            .config
            .macro_study
            .data_dir
            .join(macro_files::EXTERNAL_FACTORS);
        let external = ExternalFactors::resolve(self.macro_factors().await, &saved);

        let live = self.live_returns().await.map_err(|e| {
            warn!(error = %e, "live ETF returns unavailable");
            e.to_string()
        });

        Ok(GlobalMacroData {
            fund,
            ff5,
            external,
            live,
        })
    }
}

/// Print cache location and statistics.
pub(crate) fn print_cache_info() {
    let path = cache_manager::cache_path();
    println!("  Cache location: {}", path.display());
    if !path.is_file() {
        println!("  Cache is empty");
        return;
    }
    match cache_manager::open_cache().and_then(|cache| cache.get_stats()) {
        Ok(stats) => {
            println!(
                "  Cached downloads: {} ({:.1} KiB)",
                stats.payloads,
                stats.payload_bytes as f64 / 1024.0
            );
            println!(
                "  Cached closes: {} for {} symbols",
                stats.total_quotes, stats.unique_symbols
            );
        }
        Err(e) => println!("  Could not read cache: {e}"),
    }
}

/// Clear the whole cache, or one symbol's closes.
pub(crate) fn clear_cache(symbol: Option<&str>) -> Result<(), DataPipelineError> {
    let cache = cache_manager::open_cache()?;
    match symbol {
        Some(symbol) => {
            cache.clear_symbol(symbol)?;
            info!(symbol, "cleared cached closes");
        }
        None => {
            cache.clear_all()?;
            info!("cleared cache");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    const UNREACHABLE: &str = "http://127.0.0.1:9/umd.zip";

    fn temp_cache(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("factorlab-pipeline-tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("cache.db")
    }

    fn pipeline(cache: SqliteCache, fetch: FetchConfig) -> DataPipeline {
        DataPipeline {
            config: StudyConfig::default(),
            fetch,
            http: HttpClient::with_timeout(Duration::from_secs(2)).unwrap(),
            yahoo: YahooQuoteProvider::new().unwrap(),
            cache: Some(cache),
        }
    }

    #[tokio::test]
    async fn unreadable_cache_entry_falls_back_to_download() {
        let path = temp_cache("bad-timestamp");
        let cache = SqliteCache::new(&path).unwrap();
        Connection::open(&path)
            .unwrap()
            .execute(
                "INSERT INTO payloads (url, body, cached_at) VALUES (?1, x'00', '2024-01-01 00:00:00')",
                [UNREACHABLE],
            )
            .unwrap();
        let pipeline = pipeline(cache, FetchConfig::default());

        assert!(pipeline.cached_payload(UNREACHABLE).is_none());
        let err = pipeline.payload(UNREACHABLE).await.unwrap_err();
        assert!(matches!(err, DataPipelineError::Fetch(DataError::Network(_))));
    }

    #[test]
    fn stale_payloads_are_downloaded_again() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_payload(UNREACHABLE, b"zip").unwrap();
        let fresh = pipeline(cache, FetchConfig::default());
        assert_eq!(fresh.cached_payload(UNREACHABLE), Some(b"zip".to_vec()));

        let expired = DataPipeline {
            fetch: FetchConfig {
                payload_max_age: TimeDelta::zero(),
                ..FetchConfig::default()
            },
            ..fresh
        };
        assert!(expired.cached_payload(UNREACHABLE).is_none());
    }

    #[test]
    fn refresh_skips_cached_closes() {
        let cache = SqliteCache::in_memory().unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        cache.put_quotes("SPMO", &[(start, 100.0), (end, 101.0)]).unwrap();

        let cached = pipeline(cache, FetchConfig::default());
        assert_eq!(cached.cached_closes("SPMO", start, end).map(|c| c.len()), Some(2));
        assert!(cached.cached_closes("MTUM", start, end).is_none());

        let refreshing = DataPipeline {
            fetch: FetchConfig {
                force_refresh: true,
                ..FetchConfig::default()
            },
            ..cached
        };
        assert!(refreshing.cached_closes("SPMO", start, end).is_none());
    }
}
