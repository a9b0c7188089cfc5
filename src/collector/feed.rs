use tracing::{debug, info};
use url::Url;

use super::{CollectError, CollectorSettings, FeedQuery, PostReference};
use crate::browser::{Locator, RemoteBrowser, RemoteElement};
use crate::constants::{
    scroll_back_script, FEED_IMAGE_TAG, FEED_POST_LINK_SELECTOR, LOAD_MORE_XPATH,
    SCROLL_TO_BOTTOM_SCRIPT,
};

/// Expands a hashtag feed and harvests its post tiles.
pub struct FeedLoader<'a, B> {
    browser: &'a B,
    settings: &'a CollectorSettings,
}

impl<'a, B: RemoteBrowser> FeedLoader<'a, B> {
    #[must_use]
    pub fn new(browser: &'a B, settings: &'a CollectorSettings) -> Self {
        Self { browser, settings }
    }

    /// Load the feed for `query` and return up to `max_posts` references in
    /// DOM order.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::LoadMoreMissing`] if the feed cannot be
    /// expanded, or a browser error if any feed page interaction fails.
    pub async fn load(&self, query: &FeedQuery) -> Result<Vec<PostReference>, CollectError> {
        let url = self.settings.feed_url(query.hashtag());
        info!(hashtag = %query.hashtag(), url = %url, "Loading hashtag feed");

        self.browser.navigate(&url).await?;
        self.expand(query.hashtag()).await?;
        self.scroll(query.max_scrolls()).await?;

        let tiles = self
            .browser
            .find_elements(Locator::Css(FEED_POST_LINK_SELECTOR))
            .await?;
        debug!(found = tiles.len(), "Feed tiles found");

        let base = Url::parse(&url).ok();
        let mut references = Vec::with_capacity(tiles.len().min(query.max_posts()));
        for tile in &tiles {
            if references.len() == query.max_posts() {
                break;
            }
            if let Some(reference) = read_tile(tile, base.as_ref()).await? {
                references.push(reference);
            }
        }

        info!(
            hashtag = %query.hashtag(),
            found = tiles.len(),
            harvested = references.len(),
            "Feed harvested"
        );

        Ok(references)
    }

    async fn expand(&self, hashtag: &str) -> Result<(), CollectError> {
        let Some(button) = self
            .browser
            .find_element(Locator::XPath(LOAD_MORE_XPATH))
            .await?
        else {
            return Err(CollectError::LoadMoreMissing {
                hashtag: hashtag.to_string(),
            });
        };
        button.click().await?;
        Ok(())
    }

    /// Fixed number of bottom/back-off scroll pairs. Nothing checks whether
    /// new tiles actually arrived.
    async fn scroll(&self, iterations: u32) -> Result<(), CollectError> {
        let back_off = scroll_back_script(self.settings.scroll_back_offset);
        for i in 0..iterations {
            self.browser.execute_script(SCROLL_TO_BOTTOM_SCRIPT).await?;
            tokio::time::sleep(self.settings.scroll_pause).await;
            self.browser.execute_script(&back_off).await?;
            tokio::time::sleep(self.settings.scroll_pause).await;
            debug!(iteration = i + 1, of = iterations, "Scrolled feed");
        }
        Ok(())
    }
}

/// Build a reference from a feed tile. Tiles without an href or thumbnail are
/// not posts and yield `None`.
async fn read_tile<E: RemoteElement>(
    tile: &E,
    base: Option<&Url>,
) -> Result<Option<PostReference>, CollectError> {
    let Some(href) = tile.attribute("href").await? else {
        debug!("Skipping feed tile without href");
        return Ok(None);
    };
    let Some(image) = tile.find_element(FEED_IMAGE_TAG).await? else {
        debug!(href = %href, "Skipping feed tile without thumbnail");
        return Ok(None);
    };

    Ok(Some(PostReference {
        link: resolve_link(base, &href),
        image: image.attribute("src").await?.unwrap_or_default(),
        text: image.attribute("alt").await?.filter(|s| !s.is_empty()),
    }))
}

fn resolve_link(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map_or_else(|| href.to_string(), String::from)
}
