//! stockseries CLI - consolidate price CSVs and prepare chart series.
//!
//! Commands:
//! - `consolidate` - chain one dataset across a data tree into a single CSV
//! - `scatter` - one field of one symbol over time, as a JSON series
//! - `candlestick` - up/down OHLC candles of one symbol, as a JSON series
//! - `index` - list the groups and datasets found in a data tree

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockseries_core::chart::{
    CandlestickSeries, ChartSink, JsonChartSink, ScatterSeries, DEFAULT_SYMBOL,
};
use stockseries_core::data::{
    load_series, read_consolidated, write_consolidated, DirectoryIndex, IndexOptions,
    MalformedPolicy,
};
use stockseries_core::domain::PriceField;
use stockseries_core::timing::{timed, TimedScope};
use stockseries_core::PipelineConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockseries",
    about = "stockseries - consolidate per-symbol price CSVs and chart them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chain one dataset from every subdirectory into a single CSV.
    Consolidate {
        /// TOML config file. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Root data directory. Defaults to ./data.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output file. Defaults to all.csv.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Dataset name (file stem) to chain. Defaults to prices.
        #[arg(long)]
        target: Option<String>,

        /// What a malformed row does: truncate, skip or fail.
        #[arg(long)]
        on_malformed: Option<MalformedPolicy>,
    },
    /// Write one field of one symbol against time as a JSON series.
    Scatter {
        /// Consolidated input file.
        #[arg(long, default_value = "all.csv")]
        input: PathBuf,

        #[arg(long, default_value = DEFAULT_SYMBOL)]
        symbol: String,

        /// open, high, low, close, adj_close or volume.
        #[arg(long, default_value = "adj_close")]
        field: PriceField,

        #[arg(long, default_value = "scatter.json")]
        output: PathBuf,
    },
    /// Write up/down OHLC candles of one symbol as a JSON series.
    Candlestick {
        /// Consolidated input file.
        #[arg(long, default_value = "all.csv")]
        input: PathBuf,

        #[arg(long, default_value = DEFAULT_SYMBOL)]
        symbol: String,

        #[arg(long, default_value = "candlestick.json")]
        output: PathBuf,
    },
    /// List the groups and datasets found under a data directory.
    Index {
        /// Root data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// File extension to index.
        #[arg(long, default_value = "csv")]
        extension: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Consolidate {
            config,
            data_dir,
            output,
            target,
            on_malformed,
        } => {
            let mut cfg = match config {
                Some(path) => PipelineConfig::from_file(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(dir) = data_dir {
                cfg.data_dir = dir;
            }
            if let Some(out) = output {
                cfg.output = out;
            }
            if let Some(t) = target {
                cfg.target = t;
            }
            if let Some(policy) = on_malformed {
                cfg.on_malformed = policy;
            }
            cfg.validate()?;
            run_consolidate(&cfg)
        }
        Commands::Scatter {
            input,
            symbol,
            field,
            output,
        } => run_scatter(input, &symbol, field, output),
        Commands::Candlestick {
            input,
            symbol,
            output,
        } => run_candlestick(input, &symbol, output),
        Commands::Index {
            data_dir,
            extension,
        } => run_index(data_dir, extension),
    }
}

fn run_consolidate(cfg: &PipelineConfig) -> Result<()> {
    let _scope = TimedScope::new("consolidating data");

    let series = load_series(&cfg.data_dir, cfg)
        .with_context(|| format!("failed to load {}", cfg.data_dir.display()))?;
    let summary = write_consolidated(&cfg.output, series)
        .with_context(|| format!("failed to write {}", cfg.output.display()))?;

    println!(
        "Wrote {} rows for {} symbols to {}",
        summary.rows,
        summary.symbols,
        summary.path.display()
    );
    Ok(())
}

fn run_scatter(input: PathBuf, symbol: &str, field: PriceField, output: PathBuf) -> Result<()> {
    let series = {
        let _scope = TimedScope::new("loading data");
        let records = read_consolidated(&input, MalformedPolicy::Truncate)
            .with_context(|| format!("failed to read {}", input.display()))?;
        ScatterSeries::collect(records, symbol, field)?
    };

    let mut sink = JsonChartSink::new(output);
    sink.render_scatter(&series)?;
    println!(
        "{}: {} points of {} -> {}",
        series.title,
        series.points.len(),
        series.field,
        sink.path().display()
    );
    Ok(())
}

fn run_candlestick(input: PathBuf, symbol: &str, output: PathBuf) -> Result<()> {
    let series = {
        let _scope = TimedScope::new("loading data");
        let records = read_consolidated(&input, MalformedPolicy::Truncate)
            .with_context(|| format!("failed to read {}", input.display()))?;
        CandlestickSeries::collect(records, symbol)?
    };

    let mut sink = JsonChartSink::new(output);
    sink.render_candlestick(&series)?;
    println!(
        "{}: {} up / {} down candles -> {}",
        series.title,
        series.up.len(),
        series.down.len(),
        sink.path().display()
    );
    Ok(())
}

fn run_index(data_dir: PathBuf, extension: String) -> Result<()> {
    let opts = IndexOptions {
        extension,
        ..IndexOptions::default()
    };
    let (index, elapsed) = timed("indexing data", || DirectoryIndex::build(&data_dir, &opts));
    let index = index.with_context(|| format!("failed to index {}", data_dir.display()))?;

    if index.is_empty() {
        println!("No datasets under {}", data_dir.display());
        return Ok(());
    }

    println!("{:<24} DATASETS", "GROUP");
    println!("{}", "-".repeat(48));
    for (name, group) in index.iter() {
        let datasets: Vec<&str> = group.names().collect();
        println!("{:<24} {}", name, datasets.join(", "));
    }
    println!(
        "{} groups indexed in {:.3}ms",
        index.len(),
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}
