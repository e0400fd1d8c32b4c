//! Sumi-Scheduler main entry point
//!
//! This is the command-line interface for running a crawler's job loop.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_scheduler::config::{load_config_with_hash, Config};
use sumi_scheduler::crawler::build_crawler;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Scheduler: a fair, restart-safe job loop
///
/// Runs the configured jobs whenever they need to, ranks them by priority and
/// recent cost, backs off failing jobs, and persists their history so a
/// restart continues where the previous run stopped.
#[derive(Parser, Debug)]
#[command(name = "sumi-scheduler")]
#[command(version = "1.0.0")]
#[command(about = "A fair, restart-safe job loop for crawlers", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the jobs without running them
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show per-job statistics from the persisted state and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Only run these jobs, ignoring backoff and freshness
    #[arg(long, value_name = "ID", num_args = 1..)]
    focus: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if !cli.focus.is_empty() {
        config.crawler.focus = cli.focus;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_run(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_scheduler=info,warn"),
            1 => EnvFilter::new("sumi_scheduler=debug,info"),
            2 => EnvFilter::new("sumi_scheduler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective settings and jobs
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Scheduler Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler:");
    println!("  Id: {}", crawler.id);
    println!("  Version: {}", crawler.version);
    println!("  Batch size: {}", crawler.batch_size);
    println!("  Idle sleep: {}s", crawler.idle_sleep);
    println!(
        "  Retry timeout: {}s (max {}s)",
        crawler.retry_timeout, crawler.max_retry_timeout
    );
    match crawler.job_timeout {
        Some(timeout) => println!("  Job timeout: {}s", timeout),
        None => println!("  Job timeout: none"),
    }
    if !crawler.focus.is_empty() {
        println!("  Focus: {}", crawler.focus.join(", "));
    }

    println!("\nStorage:");
    println!("  Backend: {:?}", config.storage.backend);
    println!("  Data dir: {}", config.storage.data_dir);

    println!("\nJobs ({}):", config.jobs.len());
    let mut jobs: Vec<_> = config.jobs.iter().collect();
    jobs.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    for job in jobs {
        println!(
            "  - {} (priority {}, every {}s)",
            job.id, job.priority, job.max_age
        );
        println!("    command: {}", job.command);
        if let Some(after) = &job.after {
            println!("    after:   {}", after);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the persisted snapshot
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use sumi_scheduler::output::{load_statistics, print_statistics};
    use sumi_scheduler::storage::open_store;

    println!("Data dir: {}\n", config.storage.data_dir);

    let store = open_store(&config.storage, &config.crawler.id)?;
    let states = store.read(&config.crawler.id)?.unwrap_or_default();

    print_statistics(&load_statistics(&states));

    Ok(())
}

/// Handles the main run: loops until Ctrl-C
async fn handle_run(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Crawler '{}' v{} with {} jobs",
        config.crawler.id,
        config.crawler.version,
        config.jobs.len()
    );

    let mut crawler = build_crawler(config)?;
    crawler.load()?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                signal.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match crawler.run(shutdown).await {
        Ok(()) => {
            tracing::info!("Crawler stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawler failed: {}", e);
            Err(e.into())
        }
    }
}
