//! # Recmatch CLI (`recmatch`)
//!
//! The `recmatch` binary fetches two labeled record sets and writes the
//! fuzzy-matched table as CSV.
//!
//! ## Usage
//!
//! ```bash
//! recmatch match --left <path-or-url> --right <path-or-url> [--threshold 40] [--out report.csv]
//! ```
//!
//! Sources are HTTP JSON endpoints (`http://` / `https://` URLs serving
//! an array of `{id, name}` objects) or local CSV files with a `Name`
//! column. Without `--out`, the report goes to stdout.
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Run completed (unmatched records print a warning) |
//! | 1 | Any fetch or configuration error |
//! | 2 | `--strict` and some left records had no match |

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use recmatch::config::{ClientConfig, MatchConfig, PipelineConfig, RetryConfig};
use recmatch::matching::SimilarityKind;
use recmatch::pipeline::Orchestrator;
use recmatch::sources::source_for;

/// Recmatch - resilient fetching and fuzzy matching of labeled records.
#[derive(Parser)]
#[command(name = "recmatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch two record sets and write the matched table.
    #[command(name = "match")]
    Match(MatchArgs),
}

#[derive(Args)]
struct MatchArgs {
    /// Left record source: a URL or a CSV path.
    #[arg(long)]
    left: String,

    /// Right record source: a URL or a CSV path.
    #[arg(long)]
    right: String,

    /// Minimum similarity score, 0-100, for a pair to count as a match.
    #[arg(long, default_value_t = 40.0)]
    threshold: f64,

    /// Similarity function: token_sort_ratio, normalized_levenshtein,
    /// or jaro_winkler.
    #[arg(long, default_value = "token_sort_ratio")]
    similarity: SimilarityKind,

    /// Output path for the CSV report; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Maximum attempts per fetch, including the first.
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff delay between attempts in milliseconds.
    #[arg(long, default_value_t = 500)]
    base_delay_ms: u64,

    /// Overall run deadline in milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Exit 2 when any left record has no match above the threshold.
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("recmatch: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Match(args) => run_match(args).await,
    }
}

async fn run_match(args: MatchArgs) -> anyhow::Result<i32> {
    if !(0.0..=100.0).contains(&args.threshold) {
        anyhow::bail!("--threshold must be in 0-100, got {}", args.threshold);
    }

    let mut config = PipelineConfig::new()
        .with_client(ClientConfig::default().with_timeout_ms(args.timeout_ms))
        .with_retry(
            RetryConfig::new()
                .with_max_attempts(args.max_attempts)
                .with_base_delay_ms(args.base_delay_ms),
        )
        .with_matching(
            MatchConfig::new()
                .with_threshold(args.threshold)
                .with_similarity(args.similarity),
        );
    if let Some(deadline_ms) = args.deadline_ms {
        config = config.with_deadline_ms(deadline_ms);
    }

    let left = source_for(&args.left, &config).context("invalid --left source")?;
    let right = source_for(&args.right, &config).context("invalid --right source")?;

    let report = Orchestrator::new(config)
        .run(left.as_ref(), right.as_ref())
        .await?;

    match &args.out {
        Some(path) => {
            report
                .write_csv_file(path)
                .with_context(|| format!("cannot write report to {}", path.display()))?;
            eprintln!("{}", report.summary());
        }
        None => {
            report.write_csv(std::io::stdout().lock())?;
            eprintln!("{}", report.summary());
        }
    }

    if !report.is_fully_matched() {
        eprintln!(
            "warning: {} left records had no match above threshold {}",
            report.unmatched_count(),
            args.threshold
        );
        if args.strict {
            return Ok(2);
        }
    }

    Ok(0)
}
