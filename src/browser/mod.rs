//! Remote browser abstraction.
//!
//! The collector only talks to a browser through [`RemoteBrowser`] and
//! [`RemoteElement`]. Lookups report a missing element as `Ok(None)` (or an
//! empty `Vec`); `Err` is reserved for transport failures such as a crashed
//! browser or a dropped DevTools connection.

pub mod chromium;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::{ChromiumSession, SessionConfig};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("element lookup failed for {selector}: {message}")]
    Lookup { selector: String, message: String },
    #[error("element interaction failed: {0}")]
    Interaction(String),
}

/// How to locate elements at the page level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl Locator<'_> {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }
}

impl std::fmt::Display for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css `{s}`"),
            Self::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// A browser page the collector can drive.
#[async_trait]
pub trait RemoteBrowser: Send + Sync {
    type Element: RemoteElement;

    /// Navigate the page to `url` and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Run a script in the page and return its JSON result (`Null` for
    /// `undefined`).
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    async fn find_element(
        &self,
        locator: Locator<'_>,
    ) -> Result<Option<Self::Element>, BrowserError>;

    async fn find_elements(&self, locator: Locator<'_>)
        -> Result<Vec<Self::Element>, BrowserError>;
}

/// A handle to an element on the current page.
#[async_trait]
pub trait RemoteElement: Send + Sync + Sized {
    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;

    async fn text(&self) -> Result<Option<String>, BrowserError>;

    async fn click(&self) -> Result<(), BrowserError>;

    /// First descendant matching a CSS selector.
    async fn find_element(&self, selector: &str) -> Result<Option<Self>, BrowserError>;

    /// All descendants matching a CSS selector, in document order.
    async fn find_elements(&self, selector: &str) -> Result<Vec<Self>, BrowserError>;
}
