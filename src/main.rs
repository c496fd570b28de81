//! doubook-crawler main entry point
//!
//! This is the command-line interface for the douban book crawler.

use clap::Parser;
use doubook_crawler::config::{load_config_with_hash, Config};
use doubook_crawler::crawler::{run_crawl, user_agent_string};
use doubook_crawler::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// doubook-crawler: book and review scraper for book.douban.com
///
/// Walks every tag category on the site, stores book metadata from the
/// listings and user ratings from each book's comment thread. Pages already
/// scraped in an earlier run are not scraped again.
#[derive(Parser, Debug)]
#[command(name = "doubook-crawler")]
#[command(version)]
#[command(about = "Book and review scraper for book.douban.com", long_about = None)]
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

    /// Forget every visited page before crawling
    #[arg(long)]
    fresh: bool,

    /// Follow a single path through the site: one tag, one book, one comment
    #[arg(long)]
    debug: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.debug {
        config.crawler.debug = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doubook_crawler=info,warn"),
            1 => EnvFilter::new("doubook_crawler=debug,info"),
            2 => EnvFilter::new("doubook_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== doubook-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Allowed domains: {}", config.crawler.allowed_domains.join(", "));
    println!("  Debug mode: {}", config.crawler.debug);
    println!(
        "  Blocked statuses: {}",
        config
            .crawler
            .blocked_status_codes
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Download delay: {}ms", config.crawler.download_delay);

    println!("\nUser Agent:");
    println!("  {}", user_agent_string(&config.user_agent));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.crawler.start_url);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use doubook_crawler::output::{load_statistics, print_statistics};
    use doubook_crawler::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (visited pages will be scraped again)");
    } else {
        tracing::info!("Starting crawl (visited pages are skipped)");
    }
    if config.crawler.debug {
        tracing::info!("Debug mode: one item per page, no pagination");
    }

    match run_crawl(config, config_hash, fresh).await {
        Ok(summary) => {
            tracing::info!("Crawl finished");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
