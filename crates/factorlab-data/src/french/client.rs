//! Download and unpack Ken French archives.

use super::datasets::{FF5_COLUMNS, MOMENTUM_COLUMNS};
use super::deciles::{DecilePortfolios, parse_deciles};
use super::parser::{FactorTable, parse_factor_table};
use crate::error::{DataError, Result};
use crate::http::HttpClient;
use std::io::{Cursor, Read};
use tracing::info;

/// Client for the Ken French Data Library.
#[derive(Debug, Clone)]
pub struct FrenchClient {
    http: HttpClient,
}

impl FrenchClient {
    /// Create a client on top of a shared HTTP client.
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Download an archive and return the text of its first entry.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.http.get_bytes(url).await?;
        unzip_first_entry(&bytes)
    }

    /// Monthly momentum factor as a single `UMD` column.
    pub async fn fetch_momentum(&self, url: &str) -> Result<FactorTable> {
        let table = parse_factor_table(&self.fetch_text(url).await?, &MOMENTUM_COLUMNS)?;
        info!(rows = table.len(), "UMD factor loaded");
        Ok(table)
    }

    /// Monthly Fama-French five factors plus the risk-free rate.
    pub async fn fetch_ff5(&self, url: &str) -> Result<FactorTable> {
        let table = parse_factor_table(&self.fetch_text(url).await?, &FF5_COLUMNS)?;
        info!(rows = table.len(), "FF5 factors loaded");
        Ok(table)
    }

    /// Momentum decile portfolios.
    pub async fn fetch_deciles(&self, url: &str) -> Result<DecilePortfolios> {
        parse_deciles(&self.fetch_text(url).await?)
    }
}

/// Decode the first entry of a ZIP archive as (lossy) UTF-8 text.
pub fn unzip_first_entry(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.is_empty() {
        return Err(DataError::Parse("empty ZIP archive".to_string()));
    }
    let mut entry = archive.by_index(0)?;
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(name: &str, body: &[u8]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn reads_first_entry() {
        let bytes = archive("F-F_Momentum_Factor.CSV", b",Mom\n202401,  1.00\n");
        let text = unzip_first_entry(&bytes).unwrap();
        let table = parse_factor_table(&text, &MOMENTUM_COLUMNS).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let bytes = archive("x.csv", b"caf\xe9\n");
        assert_eq!(unzip_first_entry(&bytes).unwrap(), "caf\u{fffd}\n");
    }

    #[test]
    fn not_a_zip() {
        assert!(matches!(unzip_first_entry(b"<html>"), Err(DataError::Zip(_))));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_momentum() {
        let client = FrenchClient::new(HttpClient::new().unwrap());
        let table = client.fetch_momentum(super::super::URL_UMD).await.unwrap();
        assert!(table.len() > 1000);
    }
}
