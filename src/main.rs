//! Crawlscribe main entry point
//!
//! Command-line interface for crawling one site into per-page artifacts.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use crawlscribe::config::{load_config_with_hash, validate, Config};
use crawlscribe::output::{print_ledger_summary, CrawlReport};
use crawlscribe::storage::{open_ledger, RunLedger, RunStatus};
use crawlscribe::{build_orchestrator, PageResult};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crawlscribe: a recursive site crawler and summarizer
///
/// Crawlscribe walks every page of one origin up to a depth limit, saves the
/// filtered text and a screenshot of each page and stores an AI summary
/// next to it.
#[derive(Parser, Debug)]
#[command(name = "crawlscribe")]
#[command(version)]
#[command(about = "A recursive site crawler and summarizer", long_about = None)]
struct Cli {
    /// Root URL to crawl
    #[arg(value_name = "URL", required_unless_present = "stats")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Override the maximum crawl depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Override the maximum number of simultaneously open pages
    #[arg(long)]
    max_concurrent_pages: Option<u32>,

    /// Show statistics of the latest run from the ledger and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load(&cli)?;

    if cli.stats {
        return handle_stats(&config);
    }

    match cli.url.as_deref() {
        Some(url) => handle_crawl(&config, &config_hash, url, cli.quiet).await,
        None => anyhow::bail!("a URL to crawl is required"),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawlscribe=info,warn"),
            1 => EnvFilter::new("crawlscribe=debug,info"),
            2 => EnvFilter::new("crawlscribe=trace,debug"),
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

/// Loads the configuration file (or defaults) and applies CLI overrides
fn load(cli: &Cli) -> anyhow::Result<(Config, String)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), "default".to_string()),
    };

    if let Some(output_dir) = &cli.output_dir {
        config.output.database_path = output_dir.join("crawlscribe.db");
        config.output.output_dir = output_dir.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(max_concurrent_pages) = cli.max_concurrent_pages {
        config.crawler.max_concurrent_pages = max_concurrent_pages;
    }

    validate(&config).context("invalid configuration")?;
    Ok((config, hash))
}

/// Handles --stats: prints the latest recorded run
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let ledger = open_ledger(&config.output.database_path)?;
    match ledger.get_latest_run()? {
        Some(run) => print_ledger_summary(&ledger.summarize_run(run.id)?),
        None => println!("No crawl runs recorded in {}", config.output.database_path.display()),
    }
    Ok(())
}

/// Runs one crawl, records it in the ledger and writes the report
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    url: &str,
    quiet: bool,
) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let shutdown = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            shutdown.trigger();
        }
    });

    let mut ledger = open_ledger(&config.output.database_path)?;
    let run_id = ledger.create_run(url, config_hash)?;
    let started_at = Utc::now();

    let outcome = orchestrator.scrape_website(url).await;

    let (results, status) = match &outcome {
        Ok(results) if orchestrator.shutdown_signal().is_triggered() => {
            (results.clone(), RunStatus::Interrupted)
        }
        Ok(results) => (results.clone(), RunStatus::Completed),
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            (BTreeMap::<String, PageResult>::new(), RunStatus::Failed)
        }
    };

    let recorded = ledger.record_results(run_id, results.values())?;
    ledger.finish_run(run_id, status)?;
    tracing::debug!(run_id, recorded, "Recorded run in ledger");

    let report = CrawlReport::from_results(url, &results, started_at, status);
    let report_path = config.output.report_path();
    report.write_report(&report_path)?;
    tracing::info!("Report written to {}", report_path.display());

    if !quiet {
        report.print_report();
    }

    outcome.map(|_| ()).map_err(Into::into)
}
