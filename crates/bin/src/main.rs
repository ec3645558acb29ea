//! factorlab CLI binary.
//!
//! Runs the momentum ETF studies, the global macro study and the reports
//! from the command line.

mod integration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use factorlab::data::MonthlySeries;
use factorlab::reports::write_q2_report;
use factorlab::studies::{
    self, ff6, files, global_macro, long_leg, methodology, other_etfs, print_banner, umd_beta,
};
use factorlab::StudyConfig;
use integration::data_pipeline::{
    DataPipeline, DataPipelineError, FetchConfig, clear_cache, print_cache_info, spinner,
};
use std::path::PathBuf;
use std::process;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "factorlab")]
#[command(about = "factorlab: momentum ETF and global macro factor studies", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory for tables, figures and reports
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// First day of ETF prices (YYYY-MM-DD)
    #[arg(long, global = true)]
    start: Option<NaiveDate>,

    /// Last day of ETF prices (YYYY-MM-DD), today by default
    #[arg(long, global = true)]
    end: Option<NaiveDate>,

    /// Main ETF ticker
    #[arg(long, global = true)]
    ticker: Option<String>,

    /// Disable caching (always fetch fresh data)
    #[arg(long, global = true)]
    no_cache: bool,

    /// Force refresh cached data (downloads are otherwise reused for 7 days)
    #[arg(long, global = true)]
    refresh: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Q2.1: UMD beta of the ETF with diagnostics
    UmdBeta,

    /// Q2.2: ETF methodology versus the academic UMD factor
    Methodology,

    /// Q2.3: which momentum portfolio the ETF tracks best
    LongLeg,

    /// Q2.4: UMD beta controlling for the five Fama-French factors
    Ff6,

    /// Q2.5: six-factor loadings of other momentum ETFs
    OtherEtfs,

    /// Build the Q2 report from saved outputs
    Report,

    /// Run Q2.1 to Q2.5 and the Q2 report
    RunAll,

    /// Q3: global macro fund against FF5 and macro factors
    GlobalMacro,

    /// Show cache location and statistics
    CacheInfo {
        /// Clear the cache
        #[arg(long)]
        clear: bool,

        /// With --clear, only clear closes of this symbol
        #[arg(long)]
        symbol: Option<String>,
    },
}

/// One step of the momentum ETF workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    UmdBeta,
    Methodology,
    LongLeg,
    Ff6,
    OtherEtfs,
    Report,
}

const Q2_STEPS: [Step; 6] = [
    Step::UmdBeta,
    Step::Methodology,
    Step::LongLeg,
    Step::Ff6,
    Step::OtherEtfs,
    Step::Report,
];

impl Step {
    const fn label(self) -> &'static str {
        match self {
            Self::UmdBeta => "Q2.1 UMD beta",
            Self::Methodology => "Q2.2 methodology",
            Self::LongLeg => "Q2.3 long leg",
            Self::Ff6 => "Q2.4 FF6",
            Self::OtherEtfs => "Q2.5 other ETFs",
            Self::Report => "Q2 report",
        }
    }
}

/// Configuration plus a data pipeline opened on first use.
struct Context {
    config: StudyConfig,
    fetch: FetchConfig,
    pipeline: OnceCell<DataPipeline>,
}

impl Context {
    async fn pipeline(&self) -> Result<&DataPipeline, DataPipelineError> {
        self.pipeline
            .get_or_try_init(|| async { DataPipeline::new(&self.config, self.fetch) })
            .await
    }

    /// ETF and UMD returns, reusing the Q2.1 data file when it exists.
    async fn etf_and_umd(&self) -> Result<(MonthlySeries, MonthlySeries), Box<dyn std::error::Error>> {
        let saved_path = self.config.output_path(files::UMD_BETA_DATA);
        if let Some(saved) = umd_beta::load_q1_merged(&saved_path, &self.config.ticker)? {
            println!(
                "Reusing {} and UMD returns from {}",
                self.config.ticker,
                saved_path.display()
            );
            return Ok((saved.etf, saved.umd));
        }
        let pipeline = self.pipeline().await?;
        let pb = spinner(format!("Fetching {} and UMD...", self.config.ticker));
        let fetched = futures::try_join!(pipeline.etf_returns(&self.config.ticker), pipeline.umd());
        pb.finish_and_clear();
        Ok(fetched?)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let mut config = StudyConfig::load(cli.config.as_deref())?;
    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = out_dir.clone();
    }
    if let Some(start) = cli.start {
        config.start_date = start;
    }
    if let Some(end) = cli.end {
        config.end_date = Some(end);
    }
    if let Some(ticker) = &cli.ticker {
        config.ticker = ticker.to_uppercase();
    }
    config.validate()?;
    Ok(config)
}

fn fetch_config(cli: &Cli) -> FetchConfig {
    FetchConfig {
        use_cache: !cli.no_cache,
        force_refresh: cli.refresh,
        ..FetchConfig::default()
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::CacheInfo { clear, symbol } = &cli.command {
        if *clear {
            clear_cache(symbol.as_deref())?;
        }
        print_cache_info();
        return Ok(());
    }

    let config = load_config(&cli)?;
    let ctx = Context {
        config,
        fetch: fetch_config(&cli),
        pipeline: OnceCell::new(),
    };

    match cli.command {
        Commands::UmdBeta => run_step(&ctx, Step::UmdBeta).await?,
        Commands::Methodology => run_step(&ctx, Step::Methodology).await?,
        Commands::LongLeg => run_step(&ctx, Step::LongLeg).await?,
        Commands::Ff6 => run_step(&ctx, Step::Ff6).await?,
        Commands::OtherEtfs => run_step(&ctx, Step::OtherEtfs).await?,
        Commands::Report => run_step(&ctx, Step::Report).await?,
        Commands::RunAll => run_all(&ctx).await,
        Commands::GlobalMacro => run_global_macro(&ctx).await?,
        Commands::CacheInfo { .. } => {}
    }
    Ok(())
}

async fn run_all(ctx: &Context) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", format!("FACTORLAB: {} MOMENTUM STUDIES", ctx.config.ticker));
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    if ctx.fetch.use_cache {
        print_cache_info();
        if ctx.fetch.force_refresh {
            println!("  Mode: Force refresh (re-fetching all data)");
        }
    } else {
        println!("  Cache: Disabled (fetching fresh data)");
    }
    println!();

    let mut failed = Vec::new();
    for step in Q2_STEPS {
        if let Err(e) = run_step(ctx, step).await {
            warn!(step = step.label(), error = %e, "step failed, continuing");
            println!("  ✗ {} failed: {}", step.label(), e);
            failed.push(step.label());
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed.is_empty() {
        println!("All {} steps completed ✓", Q2_STEPS.len());
    } else {
        println!(
            "{}/{} steps completed; failed: {}",
            Q2_STEPS.len() - failed.len(),
            Q2_STEPS.len(),
            failed.join(", ")
        );
    }
    println!("Outputs in {}", ctx.config.out_dir.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

async fn run_step(ctx: &Context, step: Step) -> Result<(), Box<dyn std::error::Error>> {
    let config = &ctx.config;
    let out_dir = &config.out_dir;
    info!(step = step.label(), "running");

    match step {
        Step::UmdBeta => {
            print_banner(&format!("Q2.1: {} beta on UMD", config.ticker));
            let pipeline = ctx.pipeline().await?;
            let pb = spinner(format!("Fetching {}, UMD and FF5...", config.ticker));
            let fetched = futures::try_join!(
                pipeline.etf_returns(&config.ticker),
                pipeline.umd(),
                pipeline.ff5()
            );
            pb.finish_and_clear();
            let (etf, umd, ff5) = fetched?;
            let study = umd_beta::run(&etf, &umd, &ff5, config)?;
            study.print()?;
            study.write_outputs(out_dir)?;
        }
        Step::Methodology => {
            print_banner("Q2.2: ETF methodology vs Fama-French UMD");
            let study = methodology::run(out_dir, config.predicted_beta)?;
            study.print();
            study.write_outputs(out_dir)?;
        }
        Step::LongLeg => {
            print_banner(&format!("Q2.3: which momentum leg does {} track?", config.ticker));
            let (etf, umd) = ctx.etf_and_umd().await?;
            let pipeline = ctx.pipeline().await?;
            let pb = spinner("Fetching momentum deciles...");
            let deciles = pipeline.deciles().await;
            pb.finish_and_clear();
            let study = long_leg::run(&etf, &umd, &deciles?)?;
            study.print()?;
            study.write_outputs(out_dir)?;
        }
        Step::Ff6 => {
            print_banner(&format!("Q2.4: {} on the six-factor model", config.ticker));
            let (etf, umd) = ctx.etf_and_umd().await?;
            let pipeline = ctx.pipeline().await?;
            let pb = spinner("Fetching FF5...");
            let ff5 = pipeline.ff5().await;
            pb.finish_and_clear();
            let study = ff6::run(&etf, &umd, &ff5?)?;
            study.print()?;
            study.write_outputs(out_dir)?;
        }
        Step::OtherEtfs => {
            print_banner("Q2.5: other momentum ETFs on the six-factor model");
            let pipeline = ctx.pipeline().await?;
            let pb = spinner("Fetching UMD and FF5...");
            let factors = futures::try_join!(pipeline.umd(), pipeline.ff5());
            pb.finish_and_clear();
            let (umd, ff5) = factors?;
            let factors = studies::ff6_panel(&ff5, &umd)?;

            let mut study = other_etfs::OtherEtfsStudy::default();
            for (etf, returns) in pipeline.etf_returns_many(&config.other_etfs).await {
                study.add(etf, returns, &factors);
            }
            study.write_outputs(out_dir)?;
        }
        Step::Report => {
            print_banner("Q2 report");
            print!("Building {} and {}...", files::REPORT_MD, files::REPORT_PDF);
            std::io::Write::flush(&mut std::io::stdout())?;
            match write_q2_report(out_dir, config) {
                Ok(written) => {
                    println!(" ✓");
                    for path in written {
                        println!("  {}", path.display());
                    }
                }
                Err(e) => {
                    println!(" ✗");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

async fn run_global_macro(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let macro_study = &ctx.config.macro_study;

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "GLOBAL MACRO: FF5 VS MACRO FACTORS");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let pipeline = ctx.pipeline().await?;
    let pb = spinner("Loading fund returns, FF5 and macro factors...");
    let data = pipeline.global_macro_data().await;
    pb.finish_and_clear();
    let data = data?;

    println!("Fund months: {}", data.fund.len());
    match data.external.note() {
        Some(note) => println!("External factors: {note}"),
        None => println!("External factors: fetched ✓"),
    }
    if let Err(reason) = &data.live {
        println!("Live {}: {reason}", macro_study.live_ticker);
    }

    let study = global_macro::run(&data, macro_study)?;
    study.print()?;
    study.write_outputs(&macro_study.out_dir)?;
    Ok(())
}
