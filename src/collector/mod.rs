//! Hashtag collection pipeline.
//!
//! A run has two phases executed back to back on one browser page:
//! [`FeedLoader`] expands the hashtag feed and harvests post references, then
//! [`PostEnricher`] visits each reference's detail page. Only the feed phase
//! can fail the run; detail page problems are counted and skipped.

pub mod enrich;
pub mod feed;
pub mod types;

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::browser::{BrowserError, RemoteBrowser};
use crate::constants::{
    DEFAULT_DETAIL_PAUSE_MS, DEFAULT_FEED_BASE_URL, DEFAULT_SCROLL_BACK_OFFSET_PX,
    DEFAULT_SCROLL_PAUSE_MS,
};

pub use enrich::{EnrichmentOutcome, PostEnricher};
pub use feed::FeedLoader;
pub use types::{CollectionResult, Enrichment, PopularityCount, PostKind, PostRecord, PostReference};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("feed for #{hashtag} has no 'Load more' control")]
    LoadMoreMissing { hashtag: String },
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// What to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    hashtag: String,
    max_scrolls: u32,
    max_posts: usize,
}

impl FeedQuery {
    /// Build a query, stripping surrounding whitespace and a leading `#`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::InvalidQuery`] if the hashtag is empty or
    /// `max_posts` is zero.
    pub fn new(hashtag: &str, max_scrolls: u32, max_posts: usize) -> Result<Self, CollectError> {
        let hashtag = hashtag.trim();
        let hashtag = hashtag.strip_prefix('#').unwrap_or(hashtag).trim();
        if hashtag.is_empty() {
            return Err(CollectError::InvalidQuery(
                "hashtag cannot be empty".to_string(),
            ));
        }
        if max_posts == 0 {
            return Err(CollectError::InvalidQuery(
                "max posts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            hashtag: hashtag.to_string(),
            max_scrolls,
            max_posts,
        })
    }

    #[must_use]
    pub fn hashtag(&self) -> &str {
        &self.hashtag
    }

    #[must_use]
    pub fn max_scrolls(&self) -> u32 {
        self.max_scrolls
    }

    #[must_use]
    pub fn max_posts(&self) -> usize {
        self.max_posts
    }
}

/// Site location and pacing of a run.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Hashtag pages live at `{feed_base_url}/{hashtag}`.
    pub feed_base_url: String,
    /// Pause after each scroll script.
    pub scroll_pause: Duration,
    /// Pause after navigating to a detail page.
    pub detail_pause: Duration,
    /// Pixels above the bottom for the second scroll of each iteration.
    pub scroll_back_offset: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            scroll_pause: Duration::from_millis(DEFAULT_SCROLL_PAUSE_MS),
            detail_pause: Duration::from_millis(DEFAULT_DETAIL_PAUSE_MS),
            scroll_back_offset: DEFAULT_SCROLL_BACK_OFFSET_PX,
        }
    }
}

impl CollectorSettings {
    /// Feed page URL for a hashtag.
    #[must_use]
    pub fn feed_url(&self, hashtag: &str) -> String {
        format!(
            "{}/{}",
            self.feed_base_url.trim_end_matches('/'),
            urlencoding::encode(hashtag)
        )
    }
}

/// Collect and enrich the posts of one hashtag.
///
/// # Errors
///
/// Fails if the feed page cannot be loaded or expanded. Detail page problems
/// never fail the run; they are reflected in
/// [`CollectionResult::error_count`].
pub async fn collect<B: RemoteBrowser>(
    browser: &B,
    settings: &CollectorSettings,
    query: &FeedQuery,
) -> Result<CollectionResult, CollectError> {
    let started = Instant::now();

    let references = FeedLoader::new(browser, settings).load(query).await?;
    let outcome = PostEnricher::new(browser, settings).enrich(references).await;

    let result = CollectionResult {
        hashtag: query.hashtag().to_string(),
        posts: outcome.posts,
        error_count: outcome.error_count,
        elapsed_seconds: started.elapsed().as_secs(),
    };

    info!(
        hashtag = %result.hashtag,
        posts = result.posts.len(),
        collected = result.collected(),
        errors = result.error_count,
        elapsed_secs = result.elapsed_seconds,
        "Collection finished"
    );

    Ok(result)
}
