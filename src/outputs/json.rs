//! JSON output for API consumers.
//!
//! Both files are plain arrays of [`PostRecord`] in feed order, rewritten in
//! full on every refresh.

use crate::models::PostRecord;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

pub const RECENT_FILE: &str = "recent.json";
pub const ALL_FILE: &str = "posts.json";

/// Write the summary and full post lists to `json_output_dir`.
///
/// # Arguments
///
/// * `posts` - Every current post, in feed order
/// * `summary_count` - How many leading posts go into [`RECENT_FILE`]
/// * `json_output_dir` - Base directory for JSON output (created if missing)
///
/// # Returns
///
/// `Ok(())` on success, or an error if directory creation, serialization, or
/// file writing fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_posts(
    posts: &[PostRecord],
    summary_count: usize,
    json_output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let recent = &posts[..summary_count.min(posts.len())];
    for (file_name, list) in [(RECENT_FILE, recent), (ALL_FILE, posts)] {
        let path = format!("{}/{}", json_output_dir.trim_end_matches('/'), file_name);
        let json = serde_json::to_string_pretty(list)?;
        fs::write(&path, json).await?;
        info!(path = %path, count = list.len(), "Wrote JSON file");
    }

    Ok(())
}
