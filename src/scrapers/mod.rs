//! Destination page fetching and metadata scraping.
//!
//! Each feed entry points at an article on some publisher's site. This module
//! fetches that page and pulls out its Open Graph metadata.
//!
//! # Layers
//!
//! | Layer | Item | Notes |
//! |-------|------|-------|
//! | Transport | [`PageSource`] / [`HttpPageSource`] | One GET, browser `User-Agent`, short timeout |
//! | Extraction | [`metadata::extract_metadata`] | `og:image`, `og:description`, `description` |
//! | Policy | [`metadata::PageEnricher`] | Any failure becomes [`ScrapedData::empty`](crate::models::ScrapedData::empty) |
//!
//! Publishers are slow, flaky, and frequently block scrapers, so nothing in
//! here is allowed to fail the batch.

pub mod metadata;

use crate::error::FetchError;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument};

/// A fetched page: status code and body text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Transport for destination pages.
pub trait PageSource {
    /// Issue a single GET for `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure or timeout. Non-200
    /// responses are *not* errors; they come back as a [`FetchedPage`].
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// [`PageSource`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Build a client that identifies as `user_agent` and gives up on any
    /// single request after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = Self::client_builder(user_agent, timeout)
            .build()
            .expect("Failed to build page HTTP client");
        Self { client }
    }

    pub(crate) fn client_builder(user_agent: &str, timeout: Duration) -> ClientBuilder {
        Client::builder().timeout(timeout).user_agent(user_agent)
    }

    /// Use a preconfigured client as-is.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(status, bytes = bytes.len(), "Fetched page");
        Ok(FetchedPage {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
