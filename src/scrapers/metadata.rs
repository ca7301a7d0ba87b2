//! Open Graph metadata extraction.
//!
//! Publishers advertise a canonical image and summary for link previews via
//! `<meta property="og:*">` tags. Those are far better excerpts than the
//! keyword-highlighted snippets alert feeds ship with, so we prefer them
//! whenever a page can be fetched.
//!
//! # Lookup order
//!
//! - image: `og:image`
//! - description: `og:description`, and only when that tag is missing,
//!   `<meta name="description">`

use crate::models::ScrapedData;
use crate::scrapers::PageSource;
use crate::utils::clean_text;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

/// Fetches destination pages and scrapes their metadata.
///
/// Every failure mode (empty URL, transport error, timeout, non-200 status,
/// unparseable markup) yields [`ScrapedData::empty`].
#[derive(Debug, Clone)]
pub struct PageEnricher<S> {
    source: S,
}

impl<S: PageSource> PageEnricher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch `url` and extract its image and description.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn enrich(&self, url: &str) -> ScrapedData {
        if url.is_empty() {
            return ScrapedData::empty();
        }

        let page = match self.source.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Page fetch failed; using feed data");
                return ScrapedData::empty();
            }
        };

        if page.status != 200 {
            debug!(status = page.status, "Page returned non-OK status; using feed data");
            return ScrapedData::empty();
        }

        let data = extract_metadata(&page.body);
        debug!(
            has_image = data.image.is_some(),
            has_description = data.description.is_some(),
            "Scraped page metadata"
        );
        data
    }
}

/// Extract image and description from an HTML document.
///
/// Empty `content` attributes count as absent. Descriptions are normalized
/// with [`clean_text`].
///
/// # Examples
///
/// ```ignore
/// let html = r#"<meta property="og:image" content="https://x/a.jpg">"#;
/// assert_eq!(extract_metadata(html).image.as_deref(), Some("https://x/a.jpg"));
/// ```
pub fn extract_metadata(html: &str) -> ScrapedData {
    let document = Html::parse_document(html);

    let image = meta_content(&document, r#"meta[property="og:image"]"#)
        .flatten()
        .filter(|s| !s.is_empty());

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#))
        .map(|content| clean_text(content.as_deref()))
        .filter(|s| !s.is_empty());

    ScrapedData { image, description }
}

/// Look up the first tag matching `selector`.
///
/// The outer `Option` is whether the tag exists, the inner one whether it
/// carries a `content` attribute.
fn meta_content(document: &Html, selector: &str) -> Option<Option<String>> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.value().attr("content").map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::scrapers::FetchedPage;

    fn page(head: &str) -> String {
        format!("<!DOCTYPE html><html><head>{head}</head><body><p>Body</p></body></html>")
    }

    #[test]
    fn test_extract_og_tags() {
        let html = page(
            r#"<meta property="og:image" content="https://news.example/a.jpg">
               <meta property="og:description" content="Full &amp; complete   summary.">
               <meta name="description" content="Ignored">"#,
        );
        let data = extract_metadata(&html);
        assert_eq!(data.image.as_deref(), Some("https://news.example/a.jpg"));
        assert_eq!(data.description.as_deref(), Some("Full & complete summary."));
    }

    #[test]
    fn test_extract_falls_back_to_meta_description() {
        let html = page(r#"<meta name="description" content="<b>Plain</b> description">"#);
        let data = extract_metadata(&html);
        assert_eq!(data.image, None);
        assert_eq!(data.description.as_deref(), Some("Plain description"));
    }

    #[test]
    fn test_extract_og_description_without_content_does_not_fall_back() {
        let html = page(
            r#"<meta property="og:description">
               <meta name="description" content="Never consulted">"#,
        );
        assert_eq!(extract_metadata(&html).description, None);
    }

    #[test]
    fn test_extract_empty_values_are_absent() {
        let html = page(r#"<meta property="og:image" content=""><meta property="og:description" content="  ">"#);
        assert_eq!(extract_metadata(&html), ScrapedData::empty());
    }

    #[test]
    fn test_extract_no_metadata() {
        assert_eq!(extract_metadata(&page("<title>x</title>")), ScrapedData::empty());
        assert_eq!(extract_metadata("not even html"), ScrapedData::empty());
    }

    #[test]
    fn test_extract_first_og_image_wins() {
        let html = page(
            r#"<meta property="og:image" content="https://x/1.jpg">
               <meta property="og:image" content="https://x/2.jpg">"#,
        );
        assert_eq!(extract_metadata(&html).image.as_deref(), Some("https://x/1.jpg"));
    }

    struct StaticPage(Result<FetchedPage, ()>);

    impl PageSource for StaticPage {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.0
                .clone()
                .map_err(|_| FetchError::Timeout(url.to_string()))
        }
    }

    #[tokio::test]
    async fn test_enrich_ok_page() {
        let enricher = PageEnricher::new(StaticPage(Ok(FetchedPage {
            status: 200,
            body: page(r#"<meta property="og:image" content="https://x/a.jpg">"#),
        })));
        let data = enricher.enrich("https://x/a").await;
        assert_eq!(data.image.as_deref(), Some("https://x/a.jpg"));
    }

    #[tokio::test]
    async fn test_enrich_non_ok_status_is_empty() {
        let enricher = PageEnricher::new(StaticPage(Ok(FetchedPage {
            status: 404,
            body: page(r#"<meta property="og:image" content="https://x/a.jpg">"#),
        })));
        assert_eq!(enricher.enrich("https://x/a").await, ScrapedData::empty());
    }

    #[tokio::test]
    async fn test_enrich_fetch_error_is_empty() {
        let enricher = PageEnricher::new(StaticPage(Err(())));
        assert_eq!(enricher.enrich("https://x/a").await, ScrapedData::empty());
    }

    #[tokio::test]
    async fn test_enrich_empty_url_skips_fetch() {
        struct Unreachable;
        impl PageSource for Unreachable {
            async fn fetch(&self, _url: &str) -> Result<FetchedPage, FetchError> {
                panic!("empty URLs must not be fetched");
            }
        }
        let enricher = PageEnricher::new(Unreachable);
        assert_eq!(enricher.enrich("").await, ScrapedData::empty());
    }
}
