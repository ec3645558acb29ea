//! Export of tables to CSV and JSON.

use crate::error::{OutputError, Result};
use crate::table::Table;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::PrettyJson),
            other => Err(OutputError::InvalidFormat(format!(
                "unsupported extension {other:?} for {}",
                path.display()
            ))),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        tracing::info!(path = %path.display(), "Exported {}", format.extension());
        Ok(())
    }
}

impl Table {
    /// Rows as JSON objects keyed by header.
    pub fn to_records(&self) -> Result<Vec<Value>> {
        self.rows()
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (h, cell) in self.headers().iter().zip(row) {
                    obj.insert(h.clone(), serde_json::to_value(cell)?);
                }
                Ok::<_, OutputError>(Value::Object(obj))
            })
            .collect()
    }
}

impl Exporter for Table {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => self.to_csv_string(),
            ExportFormat::Json => Ok(serde_json::to_string(&self.to_records()?)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&self.to_records()?)?),
        }
    }
}
