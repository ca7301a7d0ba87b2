//! Feed-to-posts enrichment pipeline.
//!
//! A [`Pipeline`] run:
//! 1. **Feed**: fetch the alert feed; anything but a 200 means "no posts"
//! 2. **Fan out**: process up to `workers` entries concurrently
//! 3. **Per entry**: unwrap the redirect link, scrape the destination page,
//!    and pick the best excerpt and image available
//! 4. **Collect**: return records in feed order, whatever order they finished in
//!
//! Per-entry problems never surface here: scraping failures were already
//! turned into absent fields by the enricher. The one thing that does abort a
//! run is a worker dying unexpectedly, reported as [`PipelineError::Worker`].

use crate::config::NewsConfig;
use crate::error::PipelineError;
use crate::feed::FeedSource;
use crate::models::{PostRecord, RawEntry};
use crate::scrapers::PageSource;
use crate::scrapers::metadata::PageEnricher;
use crate::utils::{clean_text, format_date, resolve_redirect_url, smart_truncate};
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// How raw text becomes a display record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSettings {
    pub excerpt_length: usize,
    pub excerpt_suffix: String,
    pub placeholder_image: String,
}

impl From<&NewsConfig> for PostSettings {
    fn from(config: &NewsConfig) -> Self {
        Self {
            excerpt_length: config.excerpt_length,
            excerpt_suffix: config.excerpt_suffix.clone(),
            placeholder_image: config.placeholder_image.clone(),
        }
    }
}

/// Fetches the feed and enriches every entry into a [`PostRecord`].
#[derive(Debug)]
pub struct Pipeline<F, S> {
    feed: F,
    enricher: PageEnricher<S>,
    settings: PostSettings,
    workers: usize,
}

impl<F: FeedSource, S: PageSource> Pipeline<F, S> {
    /// # Arguments
    ///
    /// * `feed` - Where raw entries come from
    /// * `pages` - Transport used to fetch destination pages
    /// * `settings` - Excerpt and placeholder policy
    /// * `workers` - Maximum entries processed at once (at least 1)
    pub fn new(feed: F, pages: S, settings: PostSettings, workers: usize) -> Self {
        Self {
            feed,
            enricher: PageEnricher::new(pages),
            settings,
            workers: workers.max(1),
        }
    }

    /// Turn one raw entry into a display record.
    ///
    /// Fallback policy:
    /// - excerpt: the page's description if it has one, else the feed's own
    ///   snippet, truncated either way
    /// - image: the page's `og:image`, else the placeholder
    /// - date: reformatted for display, or the raw text if it doesn't parse
    #[instrument(level = "debug", skip_all, fields(link = %entry.link))]
    pub async fn process_entry(&self, entry: &RawEntry) -> PostRecord {
        let title = clean_text(Some(entry.title.as_str()));
        let link = resolve_redirect_url(&entry.link);
        let scraped = self.enricher.enrich(&link).await;

        let excerpt_source = match scraped.description {
            Some(description) => description,
            None => {
                debug!("No page description; falling back to feed snippet");
                clean_text(Some(entry.content.as_str()))
            }
        };
        let excerpt = smart_truncate(
            &excerpt_source,
            self.settings.excerpt_length,
            &self.settings.excerpt_suffix,
        );

        let image = scraped
            .image
            .unwrap_or_else(|| self.settings.placeholder_image.clone());

        PostRecord {
            title,
            date: format_date(&entry.published),
            excerpt,
            link,
            image,
        }
    }

    /// Run the whole pipeline once.
    ///
    /// # Returns
    ///
    /// Records in feed order. An empty list if the feed could not be fetched.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Worker`] if any entry's processing panicked. The
    /// remaining in-flight entries are dropped and no partial list is returned.
    #[instrument(level = "info", skip_all, fields(workers = self.workers))]
    pub async fn run(&self) -> Result<Vec<PostRecord>, PipelineError> {
        let t0 = Instant::now();
        let response = self.feed.fetch_feed().await;
        if !response.is_success() {
            warn!(status = ?response.status, "Feed unavailable; returning no posts");
            return Ok(Vec::new());
        }

        let total = response.entries.len();
        info!(total, "Enriching feed entries");

        let results = stream::iter(response.entries.iter().enumerate())
            .map(|(index, entry)| {
                AssertUnwindSafe(self.process_entry(entry))
                    .catch_unwind()
                    .map(move |outcome| {
                        outcome.map_err(|panic| PipelineError::Worker {
                            index,
                            reason: panic_message(panic.as_ref()),
                        })
                    })
            })
            .buffered(self.workers)
            .try_collect::<Vec<PostRecord>>()
            .await;

        let elapsed = t0.elapsed();
        match results {
            Ok(posts) => {
                info!(
                    count = posts.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Pipeline run complete"
                );
                Ok(posts)
            }
            Err(e) => {
                error!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Pipeline run aborted");
                Err(e)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::feed::FeedResponse;
    use crate::scrapers::FetchedPage;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PLACEHOLDER: &str = "https://placehold.example/600x400";

    fn settings() -> PostSettings {
        PostSettings {
            excerpt_length: 160,
            excerpt_suffix: "...".to_string(),
            placeholder_image: PLACEHOLDER.to_string(),
        }
    }

    fn entry(n: usize) -> RawEntry {
        RawEntry {
            title: format!("<b>Story</b> {n}"),
            link: format!("https://alerts.example/r?url=https%3A%2F%2Fnews.example%2F{n}"),
            published: "2024-01-07T10:30:00Z".to_string(),
            content: format!("Feed &amp; snippet {n}"),
        }
    }

    struct StaticFeed(FeedResponse);

    impl StaticFeed {
        fn ok(entries: Vec<RawEntry>) -> Self {
            Self(FeedResponse {
                status: Some(200),
                entries,
            })
        }
    }

    impl FeedSource for StaticFeed {
        async fn fetch_feed(&self) -> FeedResponse {
            self.0.clone()
        }
    }

    enum Reply {
        Page(u16, String),
        Timeout,
        Panic,
    }

    /// Page source with per-URL latency that records completion order.
    #[derive(Default)]
    struct FakePages {
        replies: HashMap<String, (Duration, Reply)>,
        completed: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakePages {
        fn with(mut self, url: &str, delay: Duration, reply: Reply) -> Self {
            self.replies.insert(url.to_string(), (delay, reply));
            self
        }
    }

    impl PageSource for &FakePages {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let missing = Reply::Page(404, String::new());
            let (delay, reply) = self
                .replies
                .get(url)
                .map(|(delay, reply)| (*delay, reply))
                .unwrap_or((Duration::ZERO, &missing));
            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.lock().unwrap().push(url.to_string());
            match reply {
                Reply::Page(status, body) => Ok(FetchedPage {
                    status: *status,
                    body: body.clone(),
                }),
                Reply::Timeout => Err(FetchError::Timeout(url.to_string())),
                Reply::Panic => panic!("page handler blew up"),
            }
        }
    }

    fn og_page(description: &str, image: &str) -> String {
        format!(
            r#"<html><head><meta property="og:description" content="{description}"><meta property="og:image" content="{image}"></head></html>"#
        )
    }

    #[tokio::test]
    async fn test_process_entry_uses_scraped_data() {
        let pages = FakePages::default().with(
            "https://news.example/1",
            Duration::ZERO,
            Reply::Page(200, og_page("Full summary.", "https://news.example/1.jpg")),
        );
        let pipeline = Pipeline::new(StaticFeed::ok(vec![]), &pages, settings(), 10);

        let post = pipeline.process_entry(&entry(1)).await;
        assert_eq!(
            post,
            PostRecord {
                title: "Story 1".to_string(),
                date: "07 Jan 2024".to_string(),
                excerpt: "Full summary.".to_string(),
                link: "https://news.example/1".to_string(),
                image: "https://news.example/1.jpg".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_process_entry_falls_back_to_feed() {
        let pages = FakePages::default();
        let pipeline = Pipeline::new(StaticFeed::ok(vec![]), &pages, settings(), 10);

        let post = pipeline.process_entry(&entry(2)).await;
        assert_eq!(post.image, PLACEHOLDER);
        assert_eq!(post.excerpt, "Feed & snippet 2");
        assert_eq!(post.link, "https://news.example/2");
    }

    #[tokio::test]
    async fn test_process_entry_truncates_long_description() {
        let long = "word ".repeat(60);
        let pages = FakePages::default().with(
            "https://news.example/3",
            Duration::ZERO,
            Reply::Page(200, og_page(&long, "https://news.example/3.jpg")),
        );
        let pipeline = Pipeline::new(StaticFeed::ok(vec![]), &pages, settings(), 10);

        let post = pipeline.process_entry(&entry(3)).await;
        assert!(post.excerpt.ends_with("..."));
        assert!(post.excerpt.chars().count() <= 163);
        assert!(post.excerpt.starts_with("word word"));
    }

    #[tokio::test]
    async fn test_process_entry_unparseable_date_passes_through() {
        let pages = FakePages::default();
        let pipeline = Pipeline::new(StaticFeed::ok(vec![]), &pages, settings(), 10);
        let raw = RawEntry {
            published: "yesterday".to_string(),
            ..entry(4)
        };
        assert_eq!(pipeline.process_entry(&raw).await.date, "yesterday");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_preserves_feed_order() {
        let mut pages = FakePages::default();
        for n in 1..=5 {
            // later entries finish first
            let delay = Duration::from_millis(100 * (6 - n as u64));
            pages = pages.with(
                &format!("https://news.example/{n}"),
                delay,
                Reply::Page(200, og_page(&format!("Summary {n}"), "https://img.example/x.jpg")),
            );
        }
        let entries: Vec<RawEntry> = (1..=5).map(entry).collect();
        let pipeline = Pipeline::new(StaticFeed::ok(entries), &pages, settings(), 10);

        let posts = pipeline.run().await.unwrap();

        let completed = pages.completed.lock().unwrap().clone();
        assert_eq!(completed.first().map(String::as_str), Some("https://news.example/5"));
        assert_eq!(completed.last().map(String::as_str), Some("https://news.example/1"));

        let excerpts: Vec<&str> = posts.iter().map(|p| p.excerpt.as_str()).collect();
        assert_eq!(
            excerpts,
            vec!["Summary 1", "Summary 2", "Summary 3", "Summary 4", "Summary 5"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_bounds_concurrency() {
        let mut pages = FakePages::default();
        for n in 0..25 {
            pages = pages.with(
                &format!("https://news.example/{n}"),
                Duration::from_millis(50),
                Reply::Page(404, String::new()),
            );
        }
        let entries: Vec<RawEntry> = (0..25).map(entry).collect();
        let pipeline = Pipeline::new(StaticFeed::ok(entries), &pages, settings(), 10);

        let posts = pipeline.run().await.unwrap();
        assert_eq!(posts.len(), 25);
        assert_eq!(pages.max_in_flight.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_run_feed_failure_is_empty() {
        let pages = FakePages::default();
        let feed = StaticFeed(FeedResponse {
            status: Some(500),
            entries: vec![entry(1)],
        });
        let pipeline = Pipeline::new(feed, &pages, settings(), 10);

        assert!(pipeline.run().await.unwrap().is_empty());
        assert!(pages.completed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_worker_panic_aborts() {
        let pages = FakePages::default()
            .with("https://news.example/2", Duration::ZERO, Reply::Panic);
        let entries: Vec<RawEntry> = (1..=3).map(entry).collect();
        let pipeline = Pipeline::new(StaticFeed::ok(entries), &pages, settings(), 10);

        let err = pipeline.run().await.unwrap_err();
        let PipelineError::Worker { index, reason } = err;
        assert_eq!(index, 1);
        assert!(reason.contains("blew up"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_end_to_end_partial_enrichment() {
        let pages = FakePages::default()
            .with(
                "https://news.example/1",
                Duration::from_millis(300),
                Reply::Page(200, og_page("Full summary.", "https://news.example/1.jpg")),
            )
            .with("https://news.example/2", Duration::from_secs(2), Reply::Timeout);
        let entries = vec![entry(1), entry(2)];
        let pipeline = Pipeline::new(StaticFeed::ok(entries), &pages, settings(), 10);

        let posts = pipeline.run().await.unwrap();
        assert_eq!(posts.len(), 2);

        assert_eq!(posts[0].title, "Story 1");
        assert_eq!(posts[0].excerpt, "Full summary.");
        assert_eq!(posts[0].image, "https://news.example/1.jpg");

        assert_eq!(posts[1].title, "Story 2");
        assert_eq!(posts[1].image, PLACEHOLDER);
        assert_eq!(posts[1].excerpt, "Feed & snippet 2");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
