//! Alert feed retrieval and parsing.
//!
//! The alert service publishes an Atom feed. Each `<entry>` carries an
//! HTML-typed title, a redirect-wrapped `<link href>`, a `<published>`
//! timestamp, and an HTML `<content>` snippet. This module turns that document
//! into [`RawEntry`] values, defaulting any missing field to an empty string.
//!
//! The pipeline talks to the feed through the [`FeedSource`] trait so tests can
//! substitute canned entries for the network.

use crate::error::{FeedError, FetchError};
use crate::models::RawEntry;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// What the feed collaborator reports back.
#[derive(Debug, Clone, Default)]
pub struct FeedResponse {
    /// HTTP status of the feed request, `None` if no response arrived.
    pub status: Option<u16>,
    /// Entries in feed order. Empty unless the status was 200.
    pub entries: Vec<RawEntry>,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        self.status == Some(200)
    }
}

/// Source of raw feed entries.
pub trait FeedSource {
    /// Fetch and parse the feed.
    ///
    /// Implementations never fail outward: transport and parse problems are
    /// reported as a [`FeedResponse`] without a 200 status.
    async fn fetch_feed(&self) -> FeedResponse;
}

/// [`FeedSource`] backed by an HTTP GET of a fixed feed URL.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("Failed to build feed HTTP client");
        Self::with_client(url, client)
    }

    /// Fetch `url` with a preconfigured client.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn download(&self) -> Result<(u16, String), FeedError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.url, e))?;
        Ok((status, body))
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch_feed(&self) -> FeedResponse {
        let (status, body) = match self.download().await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                warn!(error = %e, "Feed request failed");
                return FeedResponse::default();
            }
        };

        if status != 200 {
            warn!(status, "Feed answered with non-success status");
            return FeedResponse {
                status: Some(status),
                entries: Vec::new(),
            };
        }

        match parse_feed(&body) {
            Ok(entries) => {
                info!(count = entries.len(), "Parsed feed entries");
                FeedResponse {
                    status: Some(status),
                    entries,
                }
            }
            Err(e) => {
                warn!(error = %e, "Feed body could not be parsed");
                FeedResponse::default()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    published: Option<AtomText>,
    #[serde(default)]
    content: Option<AtomText>,
    #[serde(default)]
    summary: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
}

impl From<AtomEntry> for RawEntry {
    fn from(entry: AtomEntry) -> Self {
        let text = |t: Option<AtomText>| t.map(|t| t.value).unwrap_or_default();
        RawEntry {
            title: text(entry.title),
            link: entry
                .links
                .into_iter()
                .map(|l| l.href)
                .find(|href| !href.is_empty())
                .unwrap_or_default(),
            published: text(entry.published),
            content: text(entry.content.or(entry.summary)),
        }
    }
}

/// Parse an Atom document into entries, preserving document order.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] if the body is not well-formed XML or is not
/// shaped like an Atom `<feed>`.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>, FeedError> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)?;
    Ok(feed.entries.into_iter().map(RawEntry::from).collect())
}
