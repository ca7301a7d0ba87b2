//! Data models for feed entries and their enriched representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawEntry`]: One unprocessed item from the alert feed
//! - [`ScrapedData`]: Image and description pulled from a destination page
//! - [`PostRecord`]: The display-ready record produced for each entry
//!
//! `RawEntry` and `ScrapedData` live only for the duration of one entry's
//! processing. `PostRecord` is built once and then shared, read-only, from the
//! cache until it expires.

use serde::{Deserialize, Serialize};

/// A raw entry as delivered by the alert feed.
///
/// Every field is required; the feed parser substitutes an empty string for
/// anything the feed omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Headline, possibly containing markup such as `<b>` highlights.
    pub title: String,
    /// Entry link. Alert services usually wrap the real destination in a
    /// redirect URL.
    pub link: String,
    /// Publication timestamp in the feed's `%Y-%m-%dT%H:%M:%SZ` format.
    pub published: String,
    /// The feed's own snippet, possibly containing markup and entities.
    pub content: String,
}

/// Metadata scraped from a destination page.
///
/// Either field being `None` is the normal outcome for pages that are slow,
/// blocked, or simply lack Open Graph tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedData {
    /// The `og:image` URL.
    pub image: Option<String>,
    /// The normalized `og:description` or `description` meta text.
    pub description: Option<String>,
}

impl ScrapedData {
    /// Scraped data with both fields absent.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A fully processed, display-ready post.
///
/// Serialized as-is for the JSON outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Normalized headline.
    pub title: String,
    /// Publication date formatted for display, e.g. `07 Jan 2024`.
    pub date: String,
    /// Normalized, length-bounded summary.
    pub excerpt: String,
    /// Destination URL with any redirect wrapper removed.
    pub link: String,
    /// Article image, or the configured placeholder.
    pub image: String,
}
