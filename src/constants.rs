//! Shared constants used across the application.
//!
//! Selectors describe the structure of the hashtag feed and post detail
//! pages. They are tied to the site's markup and are the first thing to
//! revisit when collection starts returning nothing.

/// Base URL of the hashtag explore pages.
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.instagram.com/explore/tags";

/// XPath of the control that expands the initial feed.
pub const LOAD_MORE_XPATH: &str = "//a[contains(.,'Load more')]";

/// Post tiles on the feed page.
pub const FEED_POST_LINK_SELECTOR: &str = "article > div > div > div > a";

/// Thumbnail nested inside a feed post tile.
pub const FEED_IMAGE_TAG: &str = "img";

/// Engagement container on a post detail page.
pub const DETAIL_CONTAINER_SELECTOR: &str = "article > div > section > div";

/// Formatted like/view count inside the engagement container.
pub const POPULARITY_COUNT_SELECTOR: &str = "span > span";

/// Anchors counted when the formatted count is missing.
pub const POPULARITY_FALLBACK_TAG: &str = "a";

pub const TIME_TAG: &str = "time";
pub const VIDEO_TAG: &str = "video";
pub const VIDEO_SOURCE_TAG: &str = "source";

/// Default pause after each scroll script.
pub const DEFAULT_SCROLL_PAUSE_MS: u64 = 200;

/// Default pause after navigating to a post detail page.
pub const DEFAULT_DETAIL_PAUSE_MS: u64 = 300;

/// Distance above the bottom of the document for the second scroll of each
/// iteration.
pub const DEFAULT_SCROLL_BACK_OFFSET_PX: u32 = 5000;

/// Default number of scroll iterations.
pub const DEFAULT_MAX_SCROLLS: u32 = 10;

/// Default cap on harvested post references.
pub const DEFAULT_MAX_POSTS: usize = 1000;

/// Scroll to the bottom of the document.
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Scroll to `offset` pixels above the bottom of the document.
#[must_use]
pub fn scroll_back_script(offset: u32) -> String {
    format!("window.scrollTo(0, document.body.scrollHeight - {offset});")
}
