//! Markdown rendering of the post list.
//!
//! Two pages are produced, mirroring the site's home page (a handful of the
//! latest posts) and its archive page (everything currently in the feed).

use crate::models::PostRecord;
use std::error::Error;
use std::fmt::Write;
use tokio::fs;
use tracing::{info, instrument};

pub const INDEX_FILE: &str = "index.md";
pub const ALL_FILE: &str = "posts.md";

/// Render `posts` as a Markdown page titled `heading`.
///
/// Each post becomes a linked `##` heading followed by its image, date, and
/// excerpt. An empty list renders a short notice instead.
pub fn posts_to_markdown(heading: &str, posts: &[PostRecord]) -> String {
    let mut md = String::new();
    writeln!(md, "# {}\n", heading).unwrap();

    if posts.is_empty() {
        writeln!(md, "_No news right now._").unwrap();
        return md;
    }

    for post in posts {
        writeln!(md, "## [{}]({})\n", escape_brackets(&post.title), post.link).unwrap();
        writeln!(md, "![]({})\n", post.image).unwrap();
        writeln!(md, "*{}*\n", post.date).unwrap();
        writeln!(md, "{}\n", post.excerpt).unwrap();
    }
    md
}

fn escape_brackets(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}

/// Write the summary and archive pages to `markdown_output_dir`.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir))]
pub async fn write_pages(
    posts: &[PostRecord],
    summary_count: usize,
    markdown_output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(markdown_output_dir).await?;
    let dir = markdown_output_dir.trim_end_matches('/');

    let recent = &posts[..summary_count.min(posts.len())];
    let pages = [
        (INDEX_FILE, posts_to_markdown("Latest News", recent)),
        (ALL_FILE, posts_to_markdown("All News", posts)),
    ];
    for (file_name, md) in pages {
        let path = format!("{}/{}", dir, file_name);
        fs::write(&path, md).await?;
        info!(path = %path, "Wrote Markdown page");
    }
    Ok(())
}
