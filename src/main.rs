//! Board-Harvest main entry point
//!
//! This is the command-line interface for the Board-Harvest listing harvester.

use anyhow::Context;
use board_harvest::config::{load_config_with_hash, Config};
use board_harvest::crawler::{harvest, PageRequest};
use board_harvest::output::{load_statistics, print_statistics, DEFAULT_RECENT_RUNS};
use board_harvest::storage::open_storage;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Board-Harvest: a paced discussion-board listing harvester
///
/// Fetches the configured range of listing pages, extracts one posting per
/// table row, and upserts the postings into the configured collection.
#[derive(Parser, Debug)]
#[command(name = "board-harvest")]
#[command(version)]
#[command(about = "A paced discussion-board listing harvester", long_about = None)]
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

    /// Validate config and show which pages would be fetched
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show collection size and recent runs, then exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("board_harvest=info,warn"),
            1 => EnvFilter::new("board_harvest=debug,info"),
            2 => EnvFilter::new("board_harvest=trace,debug"),
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

/// Handles the --dry-run mode: prints the configuration and planned requests
fn handle_dry_run(config: &Config) {
    println!("=== Board-Harvest Dry Run ===\n");

    println!("HTTP:");
    println!("  Base URL: {}", config.http.base_url);
    println!("  Page size: {}", config.http.page_size);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  User agent: {}", config.http.user_agent);
    for name in config.http.headers.keys() {
        println!("  Header: {}", name);
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Collection: {}", config.storage.collection);

    println!(
        "\nPages ({}, {}s apart):",
        config.crawler.max_pages, config.crawler.wait_interval
    );
    for index in 0..config.crawler.max_pages {
        let request = PageRequest::for_page(&config.http.base_url, config.http.page_size, index);
        match &request.referer {
            Some(referer) => println!("  {} (referer: {})", request.url, referer),
            None => println!("  {}", request.url),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(&config.storage)
        .with_context(|| format!("Failed to open {}", config.storage.database_path))?;

    let stats = load_statistics(&storage, &config.storage.collection, DEFAULT_RECENT_RUNS)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        pages = config.crawler.max_pages,
        collection = %config.storage.collection,
        "Starting harvest"
    );

    let summary = harvest(config, config_hash)
        .await
        .context("Harvest aborted")?;

    tracing::info!(
        "Harvest finished: {} pages stored, {} fetch failures, {} parse failures, {} records upserted",
        summary.pages_stored,
        summary.pages_fetch_failed,
        summary.pages_parse_failed,
        summary.records_upserted
    );

    Ok(())
}
