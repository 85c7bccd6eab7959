use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// Use library instead of local modules
use trust_duplicates::{load_transactions, DuplicateDetector, TransactionFormat};

/// Flag likely double-submitted transactions in a batch
#[derive(Parser, Debug)]
#[command(name = "trust-duplicates")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug logging (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print duplicate clusters as JSON
    Detect {
        /// Transaction file (.csv or .json)
        path: PathBuf,

        #[arg(short, long, value_enum, default_value_t = TransactionFormat::Auto)]
        format: TransactionFormat,

        /// Cluster groups on all cores
        #[arg(long)]
        parallel: bool,

        /// Print only the summary counts
        #[arg(long)]
        summary_only: bool,
    },

    /// Print the batch with duplicate retries removed, as JSON
    Suppress {
        /// Transaction file (.csv or .json)
        path: PathBuf,

        #[arg(short, long, value_enum, default_value_t = TransactionFormat::Auto)]
        format: TransactionFormat,

        /// Cluster groups on all cores
        #[arg(long)]
        parallel: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match cli.command {
        Commands::Detect {
            path,
            format,
            parallel,
            summary_only,
        } => run_detect(&path, format, parallel, summary_only),
        Commands::Suppress {
            path,
            format,
            parallel,
        } => run_suppress(&path, format, parallel),
    }
}

fn detector(parallel: bool) -> DuplicateDetector {
    if parallel {
        DuplicateDetector::parallel()
    } else {
        DuplicateDetector::new()
    }
}

fn run_detect(
    path: &Path,
    format: TransactionFormat,
    parallel: bool,
    summary_only: bool,
) -> Result<()> {
    eprintln!("📂 Loading transactions from {:?}...", path);
    let transactions = load_transactions(path, format)?;
    eprintln!("✓ Loaded {} transactions", transactions.len());

    eprintln!("🔍 Detecting duplicates...");
    let report = detector(parallel)
        .report(&transactions)
        .context("Duplicate detection failed")?;
    eprintln!(
        "✓ {} clusters, {} flagged, {} suppressible",
        report.summary.clusters,
        report.summary.flagged_transactions,
        report.summary.suppressible_transactions
    );

    let output = if summary_only {
        serde_json::to_string_pretty(&report.summary)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", output);

    Ok(())
}

fn run_suppress(path: &Path, format: TransactionFormat, parallel: bool) -> Result<()> {
    eprintln!("📂 Loading transactions from {:?}...", path);
    let transactions = load_transactions(path, format)?;
    eprintln!("✓ Loaded {} transactions", transactions.len());

    let kept = detector(parallel)
        .suppress(&transactions)
        .context("Duplicate detection failed")?;
    eprintln!(
        "✓ Kept {} transactions, suppressed {}",
        kept.len(),
        transactions.len() - kept.len()
    );

    println!("{}", serde_json::to_string_pretty(&kept)?);

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // RUST_LOG wins over -d when set
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}
