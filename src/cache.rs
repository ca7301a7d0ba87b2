//! Time-bounded caching of the aggregated post list.
//!
//! Running the pipeline means one feed request plus a page request per entry,
//! so the result is kept for a fixed TTL and shared by every reader.
//!
//! - [`CacheStore`]: key-value store with per-key TTL ([`MemoryStore`] in process)
//! - [`PostSource`]: anything that can produce a fresh post list ([`Pipeline`])
//! - [`PostCache`]: get-or-compute over the two, plus the consumer views
//!
//! Concurrent misses are not de-duplicated: two callers racing on an expired
//! entry may both run the pipeline. Both runs produce a complete list, and the
//! later `set` simply wins.

use crate::error::PipelineError;
use crate::feed::FeedSource;
use crate::models::PostRecord;
use crate::pipeline::Pipeline;
use crate::scrapers::PageSource;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Key under which the aggregated post list is stored.
pub const POSTS_CACHE_KEY: &str = "alert_posts";

/// Shared, immutable post list as handed out by the cache.
pub type PostList = Arc<Vec<PostRecord>>;

/// Key-value store with per-key expiry.
pub trait CacheStore<V> {
    /// The stored value, or `None` if absent or expired.
    fn get(&self, key: &str) -> Option<V>;
    /// Store `value` under `key`, expiring `ttl` from now.
    fn set(&self, key: &str, value: V, ttl: Duration);
}

struct Timed<V> {
    value: V,
    expires_at: Instant,
}

/// In-process [`CacheStore`].
///
/// Value and deadline live in the same map slot and are read under one lock,
/// so a reader can never see a value paired with someone else's expiry.
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, Timed<V>>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> CacheStore<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Cache lock poisoned; reading through");
            PoisonError::into_inner(poisoned)
        });
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Cache lock poisoned; overwriting");
            PoisonError::into_inner(poisoned)
        });
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Timed {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

/// Producer of a complete, freshly computed post list.
pub trait PostSource {
    async fn fetch_posts(&self) -> Result<Vec<PostRecord>, PipelineError>;
}

impl<F: FeedSource, S: PageSource> PostSource for Pipeline<F, S> {
    async fn fetch_posts(&self) -> Result<Vec<PostRecord>, PipelineError> {
        self.run().await
    }
}

/// Get-or-compute cache in front of a [`PostSource`].
///
/// Construct one per process and share it by reference.
pub struct PostCache<C, P> {
    store: C,
    source: P,
    ttl: Duration,
}

impl<C, P> PostCache<C, P>
where
    C: CacheStore<PostList>,
    P: PostSource,
{
    pub fn new(store: C, source: P, ttl: Duration) -> Self {
        Self { store, source, ttl }
    }

    /// Return the cached post list, running the pipeline on a miss.
    ///
    /// Empty results are returned but not stored, so a feed outage is retried
    /// on the next call instead of being served for a whole TTL.
    ///
    /// # Errors
    ///
    /// Propagates [`PipelineError`] from the source. Nothing is cached in that
    /// case.
    #[instrument(level = "info", skip_all, fields(key = POSTS_CACHE_KEY))]
    pub async fn get_or_compute(&self) -> Result<PostList, PipelineError> {
        if let Some(posts) = self.store.get(POSTS_CACHE_KEY) {
            debug!(count = posts.len(), "Cache hit");
            return Ok(posts);
        }

        info!("Cache miss: fetching feed and scraping concurrently");
        let posts: PostList = Arc::new(self.source.fetch_posts().await?);
        if posts.is_empty() {
            warn!("No posts produced; leaving cache empty");
        } else {
            self.store.set(POSTS_CACHE_KEY, Arc::clone(&posts), self.ttl);
            info!(count = posts.len(), ttl_secs = self.ttl.as_secs(), "Cached post list");
        }
        Ok(posts)
    }

    /// Every current post, in feed order.
    pub async fn all_posts(&self) -> Result<PostList, PipelineError> {
        self.get_or_compute().await
    }

    /// The first `count` posts, for summary views.
    pub async fn recent_posts(&self, count: usize) -> Result<Vec<PostRecord>, PipelineError> {
        let posts = self.get_or_compute().await?;
        Ok(posts.iter().take(count).cloned().collect())
    }
}
