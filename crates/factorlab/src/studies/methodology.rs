//! ETF index methodology versus the academic UMD construction.

use super::{files, print_saved};
use crate::error::Result;
use crate::methodology::{SPMO_METHODOLOGY, UMD_METHODOLOGY, comparison_table};
use factorlab_output::Table;
use std::path::{Path, PathBuf};

/// Comparison of the two constructions plus the beta observed by the UMD
/// beta study, if it has been run.
#[derive(Debug, Clone)]
pub struct MethodologyStudy {
    comparison: Table,
    predicted_beta: (f64, f64),
    observed_beta: Option<f64>,
}

/// Build the comparison. `out_dir` is searched for an earlier UMD beta
/// summary to quote the observed beta.
///
/// # Errors
///
/// Returns an error if an existing summary file cannot be parsed.
pub fn run(out_dir: &Path, predicted_beta: (f64, f64)) -> Result<MethodologyStudy> {
    let summary = out_dir.join(files::UMD_BETA_SUMMARY);
    let observed_beta = if summary.is_file() {
        Table::read_csv(&summary)?
            .metric("Beta (UMD)")
            .and_then(|c| c.as_f64())
    } else {
        None
    };
    Ok(MethodologyStudy {
        comparison: comparison_table()?,
        predicted_beta,
        observed_beta,
    })
}

impl MethodologyStudy {
    /// Feature comparison table.
    pub const fn comparison(&self) -> &Table {
        &self.comparison
    }

    /// Beta observed by the UMD beta study.
    pub const fn observed_beta(&self) -> Option<f64> {
        self.observed_beta
    }

    /// Print both methodologies, the comparison and the observed beta.
    pub fn print(&self) {
        for (title, entries) in [
            ("SPMO METHODOLOGY (official sources)", SPMO_METHODOLOGY),
            ("ACADEMIC UMD METHODOLOGY (Fama-French)", UMD_METHODOLOGY),
        ] {
            println!("\n{title}");
            println!("{}", "-".repeat(50));
            for (key, value) in entries {
                println!("  {key:<22}: {value}");
            }
        }
        println!("\n--- Comparison table ---");
        print!("{}", self.comparison.to_ascii_table(4));
        if let Some(beta) = self.observed_beta {
            let (lo, hi) = self.predicted_beta;
            println!("\n--- Observed beta (from Q2.1) ---");
            println!("  Predicted β ≈ {lo:.2}–{hi:.2}  |  Observed β = {beta:.2}");
        }
    }

    /// Write the comparison CSV.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(files::METHODOLOGY);
        self.comparison.write_csv(&path)?;
        print_saved(&[path.as_path()]);
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorlab_output::Cell;

    fn dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factorlab-method-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn observed_beta_is_read_from_summary() {
        let out = dir("with-summary");
        Table::metrics([
            ("Beta (UMD)".to_string(), Cell::Text("0.2731".into())),
            ("N".to_string(), Cell::Integer(100)),
        ])
        .write_csv(&out.join(files::UMD_BETA_SUMMARY))
        .unwrap();
        let study = run(&out, (0.2, 0.3)).unwrap();
        assert_eq!(study.observed_beta(), Some(0.2731));
    }

    #[test]
    fn missing_summary_leaves_beta_empty() {
        let out = dir("no-summary");
        let study = run(&out, (0.2, 0.3)).unwrap();
        assert_eq!(study.observed_beta(), None);
        let written = study.write_outputs(&out).unwrap();
        let back = Table::read_csv(&written[0]).unwrap();
        assert_eq!(back.len(), 10);
        assert_eq!(back.headers()[1], "UMD (Fama-French)");
    }
}
