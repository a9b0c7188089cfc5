use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CollectorSettings, Enrichment, PopularityCount, PostKind, PostRecord, PostReference};
use crate::browser::{BrowserError, Locator, RemoteBrowser, RemoteElement};
use crate::constants::{
    DETAIL_CONTAINER_SELECTOR, POPULARITY_COUNT_SELECTOR, POPULARITY_FALLBACK_TAG, TIME_TAG,
    VIDEO_SOURCE_TAG, VIDEO_TAG,
};

/// Records produced by [`PostEnricher::enrich`], in input order.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    pub posts: Vec<PostRecord>,
    pub error_count: usize,
}

/// Why a detail page yielded no enrichment.
#[derive(Debug, Error)]
enum DetailFailure {
    #[error("navigation failed: {0}")]
    Navigation(#[source] BrowserError),
    #[error("engagement container lookup failed: {0}")]
    ContainerLookup(#[source] BrowserError),
    #[error("engagement container not found")]
    ContainerMissing,
}

/// Visits post detail pages and classifies each post.
pub struct PostEnricher<'a, B> {
    browser: &'a B,
    settings: &'a CollectorSettings,
}

impl<'a, B: RemoteBrowser> PostEnricher<'a, B> {
    #[must_use]
    pub fn new(browser: &'a B, settings: &'a CollectorSettings) -> Self {
        Self { browser, settings }
    }

    /// Visit every reference once, in order. A post whose detail page cannot
    /// be read is kept as a bare record and counted in `error_count`.
    pub async fn enrich(&self, references: Vec<PostReference>) -> EnrichmentOutcome {
        let total = references.len();
        let mut outcome = EnrichmentOutcome {
            posts: Vec::with_capacity(total),
            error_count: 0,
        };

        for (index, reference) in references.into_iter().enumerate() {
            info!(post = index + 1, total, link = %reference.link, "Visiting post");

            match self.enrich_one(&reference).await {
                Ok(enrichment) => {
                    info!(
                        link = %reference.link,
                        kind = enrichment.kind.label(),
                        count = %enrichment.kind.popularity(),
                        "Post classified"
                    );
                    outcome.posts.push(PostRecord {
                        reference,
                        enrichment: Some(enrichment),
                    });
                }
                Err(failure) => {
                    outcome.error_count += 1;
                    warn!(
                        link = %reference.link,
                        image = %reference.image,
                        reason = %failure,
                        "Failed to read post detail page"
                    );
                    outcome.posts.push(PostRecord::bare(reference));
                }
            }
        }

        outcome
    }

    async fn enrich_one(&self, reference: &PostReference) -> Result<Enrichment, DetailFailure> {
        self.browser
            .navigate(&reference.link)
            .await
            .map_err(DetailFailure::Navigation)?;
        tokio::time::sleep(self.settings.detail_pause).await;

        let container = self
            .browser
            .find_element(Locator::Css(DETAIL_CONTAINER_SELECTOR))
            .await
            .map_err(DetailFailure::ContainerLookup)?
            .ok_or(DetailFailure::ContainerMissing)?;

        let datetime = self.read_datetime().await;
        let popularity = popularity_count(&container).await;
        let kind = match self.read_video().await {
            Some(video) => PostKind::Video {
                video,
                views: popularity,
            },
            None => PostKind::Photo { likes: popularity },
        };

        Ok(Enrichment { datetime, kind })
    }

    async fn read_datetime(&self) -> Option<String> {
        let time = optional(
            self.browser.find_element(Locator::Css(TIME_TAG)).await,
            TIME_TAG,
        )?;
        optional(time.attribute("datetime").await, "datetime")
    }

    /// `Some` iff the page has a video element. The URL comes from the
    /// element's `src`, then a nested `<source>`, and is empty if neither is
    /// set.
    async fn read_video(&self) -> Option<String> {
        let video = optional(
            self.browser.find_element(Locator::Css(VIDEO_TAG)).await,
            VIDEO_TAG,
        )?;

        if let Some(src) = non_empty(optional(video.attribute("src").await, "video src")) {
            return Some(src);
        }
        if let Some(source) = optional(video.find_element(VIDEO_SOURCE_TAG).await, VIDEO_SOURCE_TAG)
        {
            if let Some(src) = non_empty(optional(source.attribute("src").await, "source src")) {
                return Some(src);
            }
        }
        Some(String::new())
    }
}

/// Rendered count if the count element exists, otherwise the number of
/// anchors in the container. An existing element with blank text still wins.
async fn popularity_count<E: RemoteElement>(container: &E) -> PopularityCount {
    if let Some(count) = optional(
        container.find_element(POPULARITY_COUNT_SELECTOR).await,
        POPULARITY_COUNT_SELECTOR,
    ) {
        let text = optional(count.text().await, "count text").unwrap_or_default();
        return PopularityCount::Displayed(text.trim().to_string());
    }

    let anchors = match container.find_elements(POPULARITY_FALLBACK_TAG).await {
        Ok(anchors) => anchors.len(),
        Err(e) => {
            debug!(error = %e, "Fallback anchor lookup failed");
            0
        }
    };
    PopularityCount::AnchorProxy(anchors)
}

/// Collapse a best-effort lookup: transport errors count as missing.
fn optional<T>(result: Result<Option<T>, BrowserError>, field: &str) -> Option<T> {
    match result {
        Ok(value) => {
            if value.is_none() {
                debug!(field, "Field missing");
            }
            value
        }
        Err(e) => {
            debug!(field, error = %e, "Field lookup failed");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_swallows_errors() {
        let missing: Option<u8> = optional(Ok(None), "time");
        assert!(missing.is_none());
        let failed: Option<u8> = optional(Err(BrowserError::Script("gone".into())), "time");
        assert!(failed.is_none());
        assert_eq!(optional(Ok(Some(3)), "time"), Some(3));
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty(Some(" 1,204 ".into())), Some("1,204".to_string()));
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
