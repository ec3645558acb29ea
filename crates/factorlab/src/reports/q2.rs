//! Smart beta ETF report (questions 2.1 to 2.5).

use crate::config::StudyConfig;
use crate::error::Result;
use crate::methodology::{SPMO_QUOTE, comparison_table};
use crate::studies::{files, print_saved};
use factorlab_output::{Cell, ReportDocument, Table};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FOOTER: &str = "Report built from q2_* CSV outputs. Generated by factorlab report.";

/// Study outputs found in the output directory.
#[derive(Debug, Clone, Default)]
pub struct Q2Inputs {
    /// UMD beta summary (`Metric,Value`)
    pub umd_beta: Option<Table>,
    /// Long-leg model comparison
    pub long_leg: Option<Table>,
    /// Six-factor coefficients
    pub ff6: Option<Table>,
    /// Six-factor loadings of the other ETFs
    pub other_etfs: Option<Table>,
    /// Whether the UMD beta diagnostics figure exists
    pub umd_beta_figure: bool,
    /// Whether the long-leg figure exists
    pub long_leg_figure: bool,
}

fn read_optional(path: &Path) -> Result<Option<Table>> {
    if !path.is_file() {
        debug!(path = %path.display(), "report input missing");
        return Ok(None);
    }
    let table = Table::read_csv(path)?;
    Ok((!table.is_empty()).then_some(table))
}

impl Q2Inputs {
    /// Read whatever study outputs exist in `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing file cannot be parsed.
    pub fn load(out_dir: &Path) -> Result<Self> {
        Ok(Self {
            umd_beta: read_optional(&out_dir.join(files::UMD_BETA_SUMMARY))?,
            long_leg: read_optional(&out_dir.join(files::LONG_LEG_MODELS))?,
            ff6: read_optional(&out_dir.join(files::FF6_RESULTS))?,
            other_etfs: read_optional(&out_dir.join(files::OTHER_ETFS))?,
            umd_beta_figure: out_dir.join(files::UMD_BETA_FIGURE).is_file(),
            long_leg_figure: out_dir.join(files::LONG_LEG_FIGURE).is_file(),
        })
    }
}

fn number(cell: Option<&Cell>) -> Option<f64> {
    cell.and_then(Cell::as_f64)
}

fn umd_beta_section(doc: &mut ReportDocument, inputs: &Q2Inputs, ticker: &str) {
    doc.heading(
        1,
        format!("1) What is the beta of {ticker} to the UMD factor? Does this mean the ETF is broken?"),
    );
    let summary = inputs.umd_beta.as_ref();
    let beta = summary.and_then(|t| number(t.metric("Beta (UMD)")));
    let (Some(summary), Some(beta)) = (summary, beta) else {
        doc.placeholder("factorlab umd-beta");
        return;
    };
    let r2 = number(summary.metric("R-squared")).unwrap_or(f64::NAN);
    let alpha = number(summary.metric("Alpha (annualized)")).unwrap_or(f64::NAN);
    let n = summary.metric("N").map(Cell::to_field).unwrap_or_default();
    let start = summary.metric("Start").map(Cell::to_field).unwrap_or_default();
    let end = summary.metric("End").map(Cell::to_field).unwrap_or_default();

    doc.paragraph(&format!(
        "The beta of {ticker} to the UMD factor, from a regression of {ticker} excess return on Mkt-RF and UMD, \
         is **{beta:.4}** over {start} to {end} (N={n} months); R² is **{r2:.4}** and annualized alpha is \
         **{:.2}%**. This shows meaningful momentum exposure. A bivariate regression on UMD alone gives a \
         misleadingly low beta because {ticker} is mostly market while UMD is market-neutral, so the \
         market-controlled regression is the appropriate specification.",
        alpha * 100.0
    ))
    .paragraph(&format!(
        "**Does this mean the ETF is broken?** **No.** A UMD beta below 1 (here {beta:.2}) is expected:"
    ))
    .bullets([
        format!("UMD is long-short while {ticker} is long-only, so it captures roughly one leg."),
        format!("{ticker} has full market exposure while UMD is market-neutral."),
        "Universe, weighting and rebalancing differ from the academic UMD.".to_string(),
    ]);
    if inputs.umd_beta_figure {
        doc.figure(
            files::UMD_BETA_FIGURE,
            format!("Figure 1: {ticker} vs UMD regression diagnostics."),
        );
    }
}

fn methodology_section(doc: &mut ReportDocument, ticker: &str) -> Result<()> {
    doc.heading(
        1,
        format!(
            "2) Read the {ticker} definition, extract a quote. How does this differ from the original UMD construction?"
        ),
    )
    .paragraph("**Quote (from the Invesco / S&P index methodology):**")
    .quote(SPMO_QUOTE)
    .paragraph("**How this differs from UMD:**")
    .table(comparison_table()?, 4);
    Ok(())
}

fn long_leg_section(doc: &mut ReportDocument, inputs: &Q2Inputs, ticker: &str) {
    doc.heading(
        1,
        "3) Extra credit: Beta to long-leg; construct long/short; VW vs EW; consistency",
    );
    let Some(models) = &inputs.long_leg else {
        doc.placeholder("factorlab long-leg");
        return;
    };
    let value = |model: &str, column: &str| number(models.lookup("Model", model, column));
    if let Some(beta_vw) = value("Winners_VW", "Beta") {
        let r2_vw = value("Winners_VW", "R-squared").unwrap_or(f64::NAN);
        let beta_ew = value("Winners_EW", "Beta").unwrap_or(f64::NAN);
        let r2_ew = value("Winners_EW", "R-squared").unwrap_or(f64::NAN);
        doc.bullets([format!(
            "**Beta to long leg:** Winners_VW β ≈ {beta_vw:.3} (R² ≈ {r2_vw:.3}); \
             Winners_EW β ≈ {beta_ew:.3} (R² ≈ {r2_ew:.3})."
        )]);
    }
    doc.paragraph(&format!(
        "The beta to the long leg is the sensitivity of {ticker} to the top momentum decile. A beta below 1 \
         means {ticker} behaves like a diluted or capped version of the winners portfolio (about 100 names with \
         a cap per name). A higher R² for Winners_VW than for Winners_EW means value-weighted winners explain \
         the returns better, as expected for a momentum-score-weighted S&P 500 product. Regressing on MomLS \
         (winners minus losers) gives a small or negative beta because {ticker} holds the winners but not the \
         short leg."
    ))
    .bullets([
        format!(
            "**Constructed long/short:** MomLS = Winners (D10) − Losers (D1). {ticker} on MomLS gives small or negative betas (long-only)."
        ),
        format!(
            "**VW vs EW:** {ticker} tracks **value-weighted** momentum more closely, **consistent** with S&P 500 and momentum-score weighting."
        ),
    ]);
    if inputs.long_leg_figure {
        doc.figure(
            files::LONG_LEG_FIGURE,
            "Figure 2: Momentum decomposition (betas and R²).",
        );
    }
}

fn ff6_section(doc: &mut ReportDocument, inputs: &Q2Inputs, ticker: &str) {
    doc.heading(
        1,
        format!(
            "4) Control for Fama-French factors. Map to the {ticker} definition. Does correcting for long-bias fix market beta? Size-bias?"
        ),
    );
    let Some(results) = &inputs.ff6 else {
        doc.placeholder("factorlab ff6");
        return;
    };
    let beta = |factor: &str| number(results.lookup("Factor", factor, "Beta"));
    if let Some(mkt) = beta("Mkt-RF") {
        let smb = beta("SMB").unwrap_or(f64::NAN);
        let umd = beta("UMD").unwrap_or(f64::NAN);
        let alpha_ann = beta("Alpha").map_or(0.0, |a| ((1.0 + a).powi(12) - 1.0) * 100.0);
        doc.bullets([format!(
            "**FF6:** Market beta ≈ {mkt:.3}, SMB ≈ {smb:.3}, UMD ≈ {umd:.3}; alpha (annual) ≈ {alpha_ann:.2}%."
        )])
        .paragraph(&format!(
            "A market beta near 1 means {ticker} has roughly full equity market exposure, as expected for a \
             long-only S&P 500 subset. A negative SMB loading is a large-cap tilt matching the S&P 500 universe. \
             A positive UMD loading means the strategy still loads on academic momentum after controlling for \
             market and size. Alpha is the average monthly return the six factors leave unexplained; an annual \
             alpha of 1-2% is modest and can reflect fees, implementation or other tilts. Controlling for factors \
             does not remove market beta, it only isolates it: the long bias is still there, separated from \
             momentum and size."
        ));
    }
    doc.bullets([
        "**Mapping:** Market beta near 1 = S&P 500 exposure; negative SMB = large caps only. Size bias **makes sense**."
            .to_string(),
        "**Long-bias:** Controlling for factors does **not** remove market beta; it stays near 1. Correcting isolates the exposure rather than removing it."
            .to_string(),
    ]);
}

fn reconciliation(ticker: &str) -> &'static str {
    match ticker {
        "MTUM" => {
            "**Reconciliation:** Large-cap momentum; market beta near 1 and negative SMB are consistent; construction is transparent."
        }
        "QMOM" => {
            "**Reconciliation:** Quantitative momentum; positive SMB is a small-cap tilt; loadings are partly opaque but consistent with momentum plus market."
        }
        _ => "**Reconciliation:** Long-only momentum; market near 1, positive UMD.",
    }
}

fn other_etfs_section(doc: &mut ReportDocument, inputs: &Q2Inputs, config: &StudyConfig) {
    doc.heading(
        1,
        "5) Two other momentum ETFs. FF6 loadings vs index construction? Opaque?",
    );
    let Some(loadings) = &inputs.other_etfs else {
        doc.placeholder("factorlab other-etfs");
        return;
    };
    let mut items = Vec::new();
    for etf in &config.other_etfs {
        let ticker = etf.ticker.as_str();
        let name = config.etf_name(ticker);
        if loadings.lookup("ticker", ticker, "ticker").is_none() {
            items.push(format!("**{ticker}** ({name}): data error."));
            continue;
        }
        let load = |factor: &str| number(loadings.lookup("ticker", ticker, factor)).unwrap_or(0.0);
        items.push(format!(
            "**{ticker}** ({name}): Mkt-RF ≈ {:.3}, SMB ≈ {:.3}, HML ≈ {:.3}, UMD ≈ {:.3}, R² ≈ {:.3}. {}",
            load("Mkt-RF"),
            load("SMB"),
            load("HML"),
            load("UMD"),
            load("R2"),
            reconciliation(ticker)
        ));
    }
    doc.bullets(items).paragraph(
        "Mkt-RF is market exposure (near 1 for long-only funds). SMB > 0 is a small-cap tilt and SMB < 0 a \
         large-cap tilt. HML is the value tilt. UMD is the momentum exposure, expected to be positive for \
         momentum ETFs. R² is the share of return variance the six factors explain; a high R² means the \
         strategy is well described by these exposures.",
    );
}

/// Assemble the report from whatever inputs are available; missing study
/// outputs become "run ... to populate" notes.
///
/// # Errors
///
/// Returns an error if the methodology table cannot be built.
pub fn build_q2_report(inputs: &Q2Inputs, config: &StudyConfig) -> Result<ReportDocument> {
    let ticker = config.ticker.as_str();
    let mut doc = ReportDocument::new();
    doc.title(format!("Question 2: Smart Beta ETFs ({ticker})"));
    umd_beta_section(&mut doc, inputs, ticker);
    doc.rule();
    methodology_section(&mut doc, ticker)?;
    doc.rule();
    long_leg_section(&mut doc, inputs, ticker);
    doc.rule();
    ff6_section(&mut doc, inputs, ticker);
    doc.rule();
    other_etfs_section(&mut doc, inputs, config);
    doc.rule().footer(FOOTER);
    Ok(doc)
}

/// Build the report from `out_dir` and write it there as Markdown and PDF.
///
/// # Errors
///
/// Returns an error when an input cannot be parsed or an output cannot be
/// written.
pub fn write_q2_report(out_dir: &Path, config: &StudyConfig) -> Result<Vec<PathBuf>> {
    let inputs = Q2Inputs::load(out_dir)?;
    let doc = build_q2_report(&inputs, config)?;
    std::fs::create_dir_all(out_dir)?;
    let md = out_dir.join(files::REPORT_MD);
    let pdf = out_dir.join(files::REPORT_PDF);
    doc.write_markdown(&md)?;
    doc.write_pdf(&pdf)?;
    info!(dir = %out_dir.display(), "report written");
    print_saved(&[md.as_path(), pdf.as_path()]);
    Ok(vec![md, pdf])
}
