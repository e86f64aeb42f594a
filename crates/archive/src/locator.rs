//! Frame discovery from the archive's daily browse index.
//!
//! The index is a plain HTML directory listing. Every frame variant the
//! archive publishes appears as an anchor; the ones we want are picked out
//! by a marker substring in the resolved link (e.g. `_1024_0193.jpg`).
//! Listings run oldest to newest, so the most recent frames are the last
//! matches in document order.

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use suncast_common::clock::TimeWindow;
use suncast_common::config::ArchiveConfig;
use suncast_common::error::{SuncastError, SuncastResult};
use suncast_common::retry::retry;
use url::Url;

use crate::http::HttpSource;

/// A link to one raw frame image, identified by its absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameReference {
    url: Url,
    cache_key: String,
}

impl FrameReference {
    /// Wrap a URL, deriving its cache key. URLs whose path has no final
    /// segment (e.g. a directory link) cannot name a frame.
    pub fn new(url: Url) -> SuncastResult<Self> {
        let cache_key = cache_key(&url)
            .ok_or_else(|| SuncastError::archive(format!("URL has no file name: {url}")))?;
        Ok(Self { url, cache_key })
    }

    pub fn parse(url: &str) -> SuncastResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| SuncastError::archive(format!("invalid frame URL {url}: {e}")))?;
        Self::new(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Local filename for this frame, shared by every run that sees the URL.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }
}

/// The final segment of the URL's path. Query and fragment are ignored.
pub fn cache_key(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    match segment {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Pull frame links out of an index document.
///
/// Every `a[href]` is resolved against `base`; links containing `marker`
/// are kept in document order and the last `limit` of them returned.
pub fn extract_frame_links(
    html: &str,
    base: &Url,
    marker: &str,
    limit: usize,
) -> SuncastResult<Vec<FrameReference>> {
    let selector = Selector::parse("a[href]")
        .map_err(|e| SuncastError::archive(format!("bad anchor selector: {e}")))?;
    let document = Html::parse_document(html);

    let matches: Vec<FrameReference> = document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| url.as_str().contains(marker))
        .filter_map(|url| FrameReference::new(url).ok())
        .collect();

    let skip = matches.len().saturating_sub(limit);
    tracing::info!(found = matches.len(), limit, "Frame URLs found");
    Ok(matches.into_iter().skip(skip).collect())
}

/// Finds the most recent frames for a time window.
#[derive(Clone)]
pub struct FrameLocator {
    http: Arc<dyn HttpSource>,
    base_url: String,
    marker: String,
    limit: usize,
    timeout: Duration,
    attempts: u32,
}

impl FrameLocator {
    pub fn new(http: Arc<dyn HttpSource>, config: &ArchiveConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            marker: config.frame_marker.clone(),
            limit: config.frame_limit,
            timeout: Duration::from_secs(config.index_timeout_secs),
            attempts: config.index_attempts,
        }
    }

    /// Fetch the window's index and return up to `limit` frame links, most
    /// recent last.
    ///
    /// The index fetch is retried on transport failures; exhausting the
    /// attempts is fatal. Zero matches is not an error here.
    pub async fn locate(&self, window: &TimeWindow) -> SuncastResult<Vec<FrameReference>> {
        let index_url = window.index_url(&self.base_url);
        tracing::info!(url = %index_url, "Fetching frames index");

        let base = Url::parse(&index_url)
            .map_err(|e| SuncastError::archive(format!("invalid index URL {index_url}: {e}")))?;

        let html = retry(
            "fetch frames index",
            self.attempts,
            SuncastError::is_transient,
            |attempt| {
                tracing::debug!(attempt, limit = self.attempts, "Requesting frames index");
                self.http.get_text(&index_url, Some(self.timeout))
            },
        )
        .await?;

        extract_frame_links(&html, &base, &self.marker, self.limit)
    }
}

impl std::fmt::Debug for FrameLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLocator")
            .field("base_url", &self.base_url)
            .field("marker", &self.marker)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("attempts", &self.attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MemorySource;
    use proptest::prelude::*;

    const INDEX: &str = "https://archive.test/assets/img/browse/2024/03/15/";

    fn index_page(names: &[String]) -> String {
        let mut html = String::from("<html><body><h1>Index</h1>\n<a href=\"../\">Parent</a>\n");
        for name in names {
            html.push_str(&format!("<a href=\"{name}\">{name}</a>\n"));
            html.push_str(&format!(
                "<a href=\"{}\">thumb</a>\n",
                name.replace("_1024_", "_512_")
            ));
        }
        html.push_str("</body></html>");
        html
    }

    fn frame_names(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("20240315_{:06}_1024_0193.jpg", i * 100))
            .collect()
    }

    fn config() -> ArchiveConfig {
        ArchiveConfig {
            base_url: "https://archive.test".to_string(),
            ..ArchiveConfig::default()
        }
    }

    #[test]
    fn test_cache_key_is_last_path_segment() {
        let url = Url::parse("https://h/a/b/20240315_000000_1024_0193.jpg?x=1#f").unwrap();
        assert_eq!(cache_key(&url).as_deref(), Some("20240315_000000_1024_0193.jpg"));
        assert_eq!(cache_key(&Url::parse("https://h/a/b/").unwrap()), None);
    }

    #[test]
    fn test_extract_resolves_relative_links_against_index() {
        let base = Url::parse(INDEX).unwrap();
        let html = index_page(&frame_names(2));
        let frames = extract_frame_links(&html, &base, "_1024_0193.jpg", 32).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].url().as_str(),
            "https://archive.test/assets/img/browse/2024/03/15/20240315_000000_1024_0193.jpg"
        );
        assert_eq!(frames[1].cache_key(), "20240315_000100_1024_0193.jpg");
    }

    #[test]
    fn test_extract_keeps_absolute_links() {
        let base = Url::parse(INDEX).unwrap();
        let html = r#"<a href="https://mirror.test/x/f_1024_0193.jpg">f</a>"#;
        let frames = extract_frame_links(html, &base, "_1024_0193.jpg", 32).unwrap();
        assert_eq!(frames[0].url().as_str(), "https://mirror.test/x/f_1024_0193.jpg");
    }

    #[test]
    fn test_extract_no_matches_is_empty() {
        let base = Url::parse(INDEX).unwrap();
        let frames = extract_frame_links("<p>nothing</p>", &base, "_1024_0193.jpg", 32).unwrap();
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_locate_returns_last_32_of_40_in_order() {
        let names = frame_names(40);
        let http = Arc::new(MemorySource::new().with_body(INDEX, index_page(&names)));
        let locator = FrameLocator::new(http, &config());

        let window = TimeWindow::new(2024, 3, 15, 14).unwrap();
        let frames = locator.locate(&window).await.unwrap();

        let keys: Vec<&str> = frames.iter().map(|f| f.cache_key()).collect();
        let expected: Vec<&str> = names[8..].iter().map(String::as_str).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_locate_retries_transient_index_failures() {
        let http = Arc::new(
            MemorySource::new()
                .with_body(INDEX, index_page(&frame_names(3)))
                .with_transient_failures(INDEX, 2),
        );
        let locator = FrameLocator::new(http.clone(), &config());
        let window = TimeWindow::new(2024, 3, 15, 14).unwrap();

        let frames = locator.locate(&window).await.unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(http.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_locate_gives_up_after_three_attempts() {
        let http = Arc::new(
            MemorySource::new()
                .with_body(INDEX, index_page(&frame_names(3)))
                .with_transient_failures(INDEX, 5),
        );
        let locator = FrameLocator::new(http.clone(), &config());
        let window = TimeWindow::new(2024, 3, 15, 14).unwrap();

        let err = locator.locate(&window).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(http.requests().len(), 3);
    }

    proptest! {
        #[test]
        fn never_exceeds_limit_or_reorders(count in 0usize..60, limit in 0usize..40) {
            let base = Url::parse(INDEX).unwrap();
            let names = frame_names(count);
            let frames = extract_frame_links(&index_page(&names), &base, "_1024_0193.jpg", limit)
                .unwrap();

            prop_assert_eq!(frames.len(), count.min(limit));
            let keys: Vec<String> = frames.iter().map(|f| f.cache_key().to_string()).collect();
            prop_assert_eq!(&keys[..], &names[count - frames.len()..]);
        }

        #[test]
        fn cache_key_is_stable(name in "[a-z0-9_]{1,24}\\.jpg", dir in "[a-z0-9]{1,8}") {
            let url = Url::parse(&format!("https://h/{dir}/{name}")).unwrap();
            let first = cache_key(&url);
            prop_assert_eq!(first.as_deref(), Some(name.as_str()));
            prop_assert_eq!(first, cache_key(&url));
        }
    }
}
