//! mfq - fuzzy melodic query command-line tool
//!
//! **Usage:**
//! ```bash
//! mfq [--config <file>] [--timings] compile <PATTERN_FILE>
//! mfq rank <PATTERN_FILE> <ROWS_JSON> [--format json|text]
//! mfq search <PATTERN_FILE> --rows <ROWS_JSON> [--format json|text]
//! ```
//!
//! Rows are a JSON array of objects keyed by the compiled projection's
//! column names.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mfq_core::perf::PerfLog;
use mfq_core::{compile, parse_query, rank, report, search, MfqConfig, ParsedQuery, ReplayExecutor};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mfq")]
#[command(about = "Compile fuzzy melodic patterns and rank their matches")]
#[command(version)]
struct Args {
    /// Configuration file (overrides MFQ_CONFIG and the user config directory)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Print per-stage timings to stderr
    #[arg(long, global = true)]
    timings: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the compiled query text
    Compile {
        pattern: PathBuf,
    },
    /// Rank a row set against a pattern
    Rank {
        pattern: PathBuf,
        rows: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Compile, execute against a replayed row set, then rank
    Search {
        pattern: PathBuf,
        #[arg(long, value_name = "ROWS_JSON")]
        rows: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Json,
    Text,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = MfqConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("mfq v{}", env!("CARGO_PKG_VERSION"));

    let mut perf = PerfLog::new();
    let output = run(args.command, &config, &mut perf)?;
    print!("{}", output);

    if args.timings {
        eprint!("{}", perf);
    }
    Ok(())
}

fn run(command: Command, config: &MfqConfig, perf: &mut PerfLog) -> Result<String> {
    match command {
        Command::Compile { pattern } => {
            let query = load_pattern(&pattern, perf)?;
            let compiled = {
                let _span = perf.span("compile");
                compile(&query, &config.compile_options())?
            };
            Ok(format!("{}\n", compiled))
        }
        Command::Rank {
            pattern,
            rows,
            format,
        } => {
            let query = load_pattern(&pattern, perf)?;
            let executor = load_rows(&rows)?;
            let ranked = {
                let _span = perf.span("rank");
                rank(executor.rows(), &query, &config.rank_options())?
            };
            render(&ranked, format)
        }
        Command::Search {
            pattern,
            rows,
            format,
        } => {
            let query = load_pattern(&pattern, perf)?;
            let mut executor = load_rows(&rows)?;
            let result = search(&query, &mut executor, config, perf)?;
            render(&result.sequences, format)
        }
    }
}

fn load_pattern(path: &Path, perf: &mut PerfLog) -> Result<ParsedQuery> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pattern file {}", path.display()))?;
    let _span = perf.span("parse");
    parse_query(&text).with_context(|| format!("Invalid pattern in {}", path.display()))
}

fn load_rows(path: &Path) -> Result<ReplayExecutor> {
    ReplayExecutor::from_file(path)
        .with_context(|| format!("Failed to load rows from {}", path.display()))
}

fn render(sequences: &[mfq_core::RankedSequence], format: Format) -> Result<String> {
    match format {
        Format::Json => Ok(format!("{}\n", report::to_json(sequences)?)),
        Format::Text => Ok(report::to_text(sequences)),
    }
}
