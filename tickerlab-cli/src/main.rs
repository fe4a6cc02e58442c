//! TickerLab CLI — sync, feature run, alpha/beta, and store commands.
//!
//! Commands:
//! - `sync` — fetch bars through a provider and persist them in the store
//! - `run` — full pipeline from a TOML config: sync, features, CSV artifacts
//! - `alpha-beta` — estimate alpha/beta of one instrument against another
//! - `store status` — report store size, symbols, and coverage ranges

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tickerlab_core::data::{BarStore, CsvProvider};
use tickerlab_core::domain::Interval;
use tickerlab_core::features::FeatureConfig;
use tickerlab_core::pipeline::{InstrumentOutcome, Pipeline, PipelineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tickerlab",
    about = "TickerLab CLI — market data store and feature pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch bars through the CSV provider and persist them in the store.
    Sync {
        /// Symbols to sync (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 5 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Bar interval: 1m, 5m, 15m, 1h, 1d, 1wk, 1mo.
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Directory holding provider CSV files, one {SYMBOL}.csv each.
        #[arg(long, default_value = "source")]
        source_dir: PathBuf,

        /// Store directory. Defaults to ./store.
        #[arg(long, default_value = "store")]
        store_dir: PathBuf,

        /// Leave gaps in place instead of filling them.
        #[arg(long, default_value_t = false)]
        no_fill: bool,

        /// Also fetch and persist option chains.
        #[arg(long, default_value_t = false)]
        options: bool,
    },
    /// Run the full pipeline (sync + features) from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Directory holding provider CSV files, one {SYMBOL}.csv each.
        #[arg(long, default_value = "source")]
        source_dir: PathBuf,
    },
    /// Estimate alpha and beta of a subject instrument against a benchmark.
    AlphaBeta {
        /// Benchmark symbol (e.g., SPY).
        benchmark: String,

        /// Subject symbol whose alpha/beta is estimated.
        subject: String,

        /// Start date (YYYY-MM-DD). Defaults to 5 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Bar interval: 1d, 1wk, 1mo.
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Target relative standard error on beta.
        #[arg(long)]
        tolerance: Option<f64>,

        /// Store directory. Defaults to ./store.
        #[arg(long, default_value = "store")]
        store_dir: PathBuf,
    },
    /// Store management commands.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Report store size, symbol count, and coverage ranges.
    Status {
        /// Store directory. Defaults to ./store.
        #[arg(long, default_value = "store")]
        store_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            symbols,
            start,
            end,
            interval,
            source_dir,
            store_dir,
            no_fill,
            options,
        } => run_sync(
            symbols, start, end, &interval, source_dir, store_dir, no_fill, options,
        ),
        Commands::Run { config, source_dir } => run_pipeline(&config, source_dir),
        Commands::AlphaBeta {
            benchmark,
            subject,
            start,
            end,
            interval,
            tolerance,
            store_dir,
        } => run_alpha_beta(
            &benchmark, &subject, start, end, &interval, tolerance, store_dir,
        ),
        Commands::Store { action } => match action {
            StoreAction::Status { store_dir } => run_store_status(&store_dir),
        },
    }
}

fn parse_range(start: Option<String>, end: Option<String>) -> Result<(NaiveDate, NaiveDate)> {
    let end_date = end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --end date")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let start_date = start
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --start date")?
        .unwrap_or(end_date - chrono::Duration::days(365 * 5));

    Ok((start_date, end_date))
}

fn parse_interval(s: &str) -> Result<Interval> {
    s.parse::<Interval>()
        .map_err(|e| anyhow::anyhow!("invalid --interval: {e}"))
}

#[allow(clippy::too_many_arguments)]
fn run_sync(
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    interval: &str,
    source_dir: PathBuf,
    store_dir: PathBuf,
    no_fill: bool,
    options: bool,
) -> Result<()> {
    let (start_date, end_date) = parse_range(start, end)?;
    let config = PipelineConfig {
        symbols,
        start: start_date,
        end: end_date,
        interval: parse_interval(interval)?,
        fill_missing: !no_fill,
        include_options: options,
        store_dir,
        features_dir: None,
        features: FeatureConfig::default(),
    };
    let provider = CsvProvider::new(source_dir);
    let pipeline = Pipeline::new(config, Box::new(provider))?;
    let report = pipeline.run()?;

    print_report(&report.outcomes);
    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_pipeline(config_path: &Path, source_dir: PathBuf) -> Result<()> {
    let config = PipelineConfig::from_toml_file(config_path)?;
    let provider = CsvProvider::new(source_dir);
    let pipeline = Pipeline::new(config, Box::new(provider))?;
    let report = pipeline.run()?;

    print_report(&report.outcomes);
    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(
    outcomes: &std::collections::BTreeMap<String, InstrumentOutcome>,
) {
    for (symbol, outcome) in outcomes {
        match outcome {
            InstrumentOutcome::Ok { rows, artifact } => match artifact {
                Some(path) => println!("{symbol}: {rows} rows -> {}", path.display()),
                None => println!("{symbol}: {rows} rows"),
            },
            InstrumentOutcome::NoData => println!("{symbol}: no data"),
            InstrumentOutcome::Failed(reason) => println!("{symbol}: FAILED ({reason})"),
        }
    }
}

fn run_alpha_beta(
    benchmark: &str,
    subject: &str,
    start: Option<String>,
    end: Option<String>,
    interval: &str,
    tolerance: Option<f64>,
    store_dir: PathBuf,
) -> Result<()> {
    let (start_date, end_date) = parse_range(start, end)?;
    let config = PipelineConfig {
        symbols: vec![benchmark.to_string(), subject.to_string()],
        start: start_date,
        end: end_date,
        interval: parse_interval(interval)?,
        fill_missing: true,
        include_options: false,
        store_dir: store_dir.clone(),
        features_dir: None,
        features: FeatureConfig::default(),
    };
    // Estimation reads the store only; the provider is never called.
    let provider = CsvProvider::new(PathBuf::from("."));
    let pipeline = Pipeline::new(config, Box::new(provider))?;

    match pipeline.alpha_beta(benchmark, subject, tolerance, None)? {
        Some(estimate) => {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(())
        }
        None => bail!(
            "estimation declined for {subject} vs {benchmark}: insufficient or degenerate data"
        ),
    }
}

fn run_store_status(store_dir: &Path) -> Result<()> {
    if !store_dir.exists() {
        println!("Store directory does not exist: {}", store_dir.display());
        return Ok(());
    }

    let store = BarStore::new(store_dir);
    let metas = store.partitions();
    if metas.is_empty() {
        println!("Store is empty: {}", store_dir.display());
        return Ok(());
    }

    let total_size = dir_size_recursive(store_dir);
    println!("Store: {}", store_dir.display());
    println!("Partitions: {}", metas.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<8} {:<5} {:<42} {:>10}",
        "Symbol", "Ivl", "Coverage", "Bars"
    );
    println!("{}", "-".repeat(68));
    for meta in &metas {
        println!(
            "{:<8} {:<5} {:<42} {:>10}",
            meta.symbol,
            meta.interval.as_str(),
            format!("{} to {}", meta.min_ts, meta.max_ts),
            meta.bar_count
        );
    }

    Ok(())
}

fn dir_size_recursive(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                size += dir_size_recursive(&p);
            } else if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
