//! # Alert Digest
//!
//! Turns a news-alert feed into display-ready posts. Each alert links to an
//! article on a publisher's site; we follow the link, read the page's Open
//! Graph metadata, and build a post with a proper image and summary, falling
//! back to the feed's own snippet and a placeholder image when a page is slow
//! or uncooperative.
//!
//! ## Usage
//!
//! ```sh
//! alert_digest -j ./json -m ./markdown
//! ```
//!
//! ## Architecture
//!
//! 1. **Feed**: Download the alert feed and parse its entries
//! 2. **Enrichment**: Scrape each entry's destination page (10 at a time, 2s timeout each)
//! 3. **Caching**: Keep the finished list for 15 minutes
//! 4. **Output**: Write JSON and Markdown views, or print the summary view

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod error;
mod feed;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cache::{MemoryStore, PostCache, PostList};
use cli::Cli;
use config::NewsConfig;
use feed::HttpFeedSource;
use outputs::{json, markdown};
use pipeline::{Pipeline, PostSettings};
use scrapers::HttpPageSource;
use utils::ensure_writable_dir;

type AlertCache = PostCache<MemoryStore<PostList>, Pipeline<HttpFeedSource, HttpPageSource>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("alert_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = match NewsConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    args.apply(&mut config);
    info!(
        feed_url = %config.feed_url,
        workers = config.worker_count(),
        ttl_secs = config.cache_ttl_secs,
        "Configuration ready"
    );

    // Early check: ensure output dirs are writable
    for dir in [&args.json_output_dir, &args.markdown_output_dir].into_iter().flatten() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Output directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    let feed = HttpFeedSource::new(&config.feed_url, &config.user_agent, config.feed_timeout());
    let pages = HttpPageSource::new(&config.user_agent, config.fetch_timeout());
    let pipeline = Pipeline::new(
        feed,
        pages,
        PostSettings::from(&config),
        config.worker_count(),
    );
    let cache: AlertCache = PostCache::new(MemoryStore::new(), pipeline, config.cache_ttl());

    match args.refresh_interval {
        None => publish(&cache, &config, &args).await?,
        Some(secs) => {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);
            info!(interval_secs = secs, "Refreshing outputs until interrupted");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = publish(&cache, &config, &args).await {
                            warn!(error = %e, "Refresh failed; will retry on next tick");
                        }
                    }
                    _ = &mut shutdown => {
                        info!("Interrupt received; shutting down");
                        break;
                    }
                }
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}

/// Read the current posts through the cache and emit every requested view.
///
/// With no output directories the summary view is printed to stdout.
async fn publish(cache: &AlertCache, config: &NewsConfig, args: &Cli) -> Result<(), Box<dyn Error>> {
    if args.json_output_dir.is_none() && args.markdown_output_dir.is_none() {
        let recent = cache.recent_posts(config.summary_count).await?;
        println!("{}", serde_json::to_string_pretty(&recent)?);
        return Ok(());
    }

    let posts = cache.all_posts().await?;
    info!(count = posts.len(), "Publishing posts");

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_posts(&posts, config.summary_count, dir).await {
            error!(path = %dir, error = %e, "Failed to write JSON output");
        }
    }

    if let Some(dir) = &args.markdown_output_dir {
        if let Err(e) = markdown::write_pages(&posts, config.summary_count, dir).await {
            error!(path = %dir, error = %e, "Failed to write Markdown output");
        }
    }

    Ok(())
}
