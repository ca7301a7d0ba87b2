//! Command-line interface definitions for Alert Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Flags override values loaded from the optional YAML config file.

use crate::config::NewsConfig;
use clap::Parser;

/// Command-line arguments for the Alert Digest application.
///
/// # Examples
///
/// ```sh
/// # Print the latest posts as JSON
/// alert_digest
///
/// # Write JSON and Markdown views, refreshing every minute
/// alert_digest -j ./json -m ./markdown --refresh-interval 60
///
/// # Different feed, fewer workers
/// ALERT_FEED_URL=https://www.google.com/alerts/feeds/1/2 alert_digest --workers 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON files
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Output directory for the Markdown pages
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Alert feed URL
    #[arg(long, env = "ALERT_FEED_URL")]
    pub feed_url: Option<String>,

    /// Maximum number of pages scraped concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    /// Number of posts in the summary view
    #[arg(long)]
    pub summary_count: Option<usize>,

    /// Keep running and regenerate outputs every N seconds
    #[arg(long, value_name = "SECS")]
    pub refresh_interval: Option<u64>,
}

impl Cli {
    /// Apply any flags that were given on top of `config`.
    pub fn apply(&self, config: &mut NewsConfig) {
        if let Some(url) = &self.feed_url {
            config.feed_url = url.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(count) = self.summary_count {
            config.summary_count = count;
        }
    }
}
