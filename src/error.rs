//! Error types shared across the pipeline.
//!
//! Most failures in this application are *not* errors: a page that cannot be
//! fetched or a feed that answers with a non-200 status degrades to absent
//! data or an empty list. The types here cover the few places where a failure
//! is worth naming:
//!
//! - [`FetchError`]: a single outbound page request failed (absorbed by the
//!   page enricher, logged, never surfaced to consumers)
//! - [`FeedError`]: the feed could not be downloaded or parsed (absorbed by the
//!   pipeline as "no entries")
//! - [`PipelineError`]: an entry worker faulted unexpectedly; the whole run is
//!   aborted and this is returned to the caller
//! - [`ConfigError`]: the optional YAML configuration could not be loaded

use thiserror::Error;

/// Failure of a single outbound HTTP request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("timed out fetching {0}")]
    Timeout(String),
    /// Connection, TLS, redirect, or any other transport failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout(url.to_string())
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Failure to obtain entries from the syndication feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("feed is not valid Atom: {0}")]
    Parse(#[from] quick_xml::de::DeError),
}

/// Unexpected fault during a pipeline run.
///
/// Only raised when a unit of work dies in a way none of the per-entry
/// fallbacks could absorb. The run is abandoned rather than returning a list
/// silently missing the entry.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("worker for entry {index} faulted: {reason}")]
    Worker { index: usize, reason: String },
}

/// Failure to load the YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
