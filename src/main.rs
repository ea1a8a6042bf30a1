//! Kagami-Mirror main entry point
//!
//! This is the command-line interface for the Kagami-Mirror documentation
//! site mirror.

use clap::Parser;
use kagami_mirror::config::load_config_with_hash;
use kagami_mirror::crawler::run_mirror;
use kagami_mirror::metadata::{load_metadata, METADATA_FILENAME};
use kagami_mirror::RunResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Kagami-Mirror: an incremental documentation site mirror
///
/// Kagami-Mirror crawls a scoped subset of a documentation site into a
/// local directory, tracking per-URL provenance across runs so unchanged
/// pages are not rewritten and disappeared pages are flagged rather than
/// deleted.
#[derive(Parser, Debug)]
#[command(name = "kagami-mirror")]
#[command(version)]
#[command(about = "An incremental documentation site mirror", long_about = None)]
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

    /// Validate config and show what would be mirrored without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the persisted metadata and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Skip the link-rewrite pass after the crawl
    #[arg(long)]
    no_rewrite: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    if cli.stats {
        return handle_stats(&config);
    }

    handle_mirror(config, !cli.no_rewrite).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kagami_mirror=info,warn"),
            1 => EnvFilter::new("kagami_mirror=debug,info"),
            2 => EnvFilter::new("kagami_mirror=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &kagami_mirror::Config) {
    println!("=== Kagami-Mirror Dry Run ===\n");

    println!("Mirror:");
    println!("  Seed URL: {}", config.mirror.seed_url);
    println!("  Content root: {}", config.mirror.content_root);
    println!("\nScope prefixes ({}):", config.mirror.scope_prefixes.len());
    for prefix in &config.mirror.scope_prefixes {
        println!("  - {}", prefix);
    }

    println!("\nFetch:");
    println!("  Max redirects: {}", config.fetch.max_redirects);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!(
        "  Rate limit backoff: {}ms",
        config.fetch.rate_limit_backoff_ms
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.name);
    println!("  Version: {}", config.user_agent.version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start mirroring from {}", config.mirror.seed_url);
}

/// Handles the --stats mode: shows statistics from the metadata file
fn handle_stats(config: &kagami_mirror::Config) -> Result<(), Box<dyn std::error::Error>> {
    let content_root = PathBuf::from(&config.mirror.content_root);

    let metadata = match load_metadata(&content_root) {
        Some(metadata) => metadata,
        None => {
            println!(
                "No metadata found at {}/{}; run a mirror first",
                content_root.display(),
                METADATA_FILENAME
            );
            return Ok(());
        }
    };

    println!("=== Mirror Statistics ===\n");
    println!("Seed URL: {}", metadata.seed_url);
    println!("Scope prefix: {}", metadata.scope_prefix);
    println!("Last update: {}", metadata.last_update);
    println!("Result: {:?}", metadata.result);
    println!();
    for (key, count) in &metadata.stats {
        println!("  {:<30} {}", key, count);
    }

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(
    config: kagami_mirror::Config,
    rewrite_links: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Starting mirror of {} ({} scope prefixes)",
        config.mirror.seed_url,
        config.mirror.scope_prefixes.len()
    );

    let report = match run_mirror(config, rewrite_links).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            return Err(e.into());
        }
    };

    println!(
        "Mirror finished: {:?} ({} fetched, {} failed, {} items, {} rewritten, {:.1?})",
        report.result, report.fetched, report.failed, report.items, report.rewritten, report.elapsed
    );

    if report.result == RunResult::Aborted {
        tracing::error!("Run aborted by the rate-limit circuit breaker");
        std::process::exit(2);
    }

    Ok(())
}
