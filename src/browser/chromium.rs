//! Headless Chromium session backed by chromiumoxide.
//!
//! One [`ChromiumSession`] owns one browser process and a single page. It is
//! acquired once per run and must be released with [`ChromiumSession::close`];
//! dropping it kills the browser process as a fallback.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{BrowserError, Locator, RemoteBrowser, RemoteElement};

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

/// Default page load timeout in seconds.
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Extra Chromium switches passed on every launch, on top of the builder's
/// defaults.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-extensions",
];

/// Browser launch configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// Page load timeout.
    pub page_timeout: Duration,
    /// Path to the browser executable (None for auto-detection).
    pub executable: Option<PathBuf>,
    /// Run without a visible window.
    pub headless: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            executable: None,
            headless: true,
        }
    }
}

/// A launched browser with one working page.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    page_timeout: Duration,
}

impl ChromiumSession {
    /// Launch the browser and open a blank page.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser config is invalid, the process cannot
    /// be started, or the initial page cannot be created.
    pub async fn launch(config: &SessionConfig) -> Result<Self, BrowserError> {
        info!(
            executable = ?config.executable,
            headless = config.headless,
            "Launching browser"
        );

        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.page_timeout)
            .no_sandbox()
            .args(LAUNCH_ARGS.iter().copied());

        // Headless flags (including --mute-audio) come from the builder
        if config.headless {
            builder = builder.new_headless_mode();
        } else {
            builder = builder.with_head();
        }

        if let Some(ref executable) = config.executable {
            builder = builder.chrome_executable(executable);
        }

        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::Launch(format!("failed to open page: {e}")));
            }
        };

        info!("Browser session ready");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            page_timeout: config.page_timeout,
        })
    }

    /// Close the page and the browser process.
    pub async fn close(mut self) {
        if let Err(e) = self.page.clone().close().await {
            warn!("Failed to close page: {e}");
        }
        let browser = self.browser.get_mut();
        if let Err(e) = browser.close().await {
            error!("Failed to close browser: {e}");
        } else if let Err(e) = browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        } else {
            info!("Browser shutdown complete");
        }
        self.handler.abort();
    }
}

/// Missing nodes surface from CDP as protocol errors, not empty results.
fn is_not_found(err: &CdpError) -> bool {
    matches!(err, CdpError::NotFound | CdpError::Chrome(_))
}

fn lookup<T>(result: Result<T, CdpError>, selector: &str) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(found) => Ok(Some(found)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(BrowserError::Lookup {
            selector: selector.to_string(),
            message: e.to_string(),
        }),
    }
}

fn lookup_all<T>(result: Result<Vec<T>, CdpError>, selector: &str) -> Result<Vec<T>, BrowserError> {
    lookup(result, selector).map(Option::unwrap_or_default)
}

#[async_trait]
impl RemoteBrowser for ChromiumSession {
    type Element = ChromiumElement;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };

        match tokio::time::timeout(self.page_timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {}s", self.page_timeout.as_secs()),
            }),
        }
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn find_element(
        &self,
        locator: Locator<'_>,
    ) -> Result<Option<ChromiumElement>, BrowserError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector).await,
            Locator::XPath(selector) => self.page.find_xpath(selector).await,
        };
        Ok(lookup(found, locator.as_str())?.map(ChromiumElement))
    }

    async fn find_elements(
        &self,
        locator: Locator<'_>,
    ) -> Result<Vec<ChromiumElement>, BrowserError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector).await,
            Locator::XPath(selector) => self.page.find_xpaths(selector).await,
        };
        Ok(lookup_all(found, locator.as_str())?
            .into_iter()
            .map(ChromiumElement)
            .collect())
    }
}

/// Element handle on the session's page.
pub struct ChromiumElement(Element);

#[async_trait]
impl RemoteElement for ChromiumElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        lookup(self.0.attribute(name).await, name).map(Option::flatten)
    }

    async fn text(&self) -> Result<Option<String>, BrowserError> {
        lookup(self.0.inner_text().await, "innerText").map(Option::flatten)
    }

    async fn click(&self) -> Result<(), BrowserError> {
        self.0
            .click()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Interaction(e.to_string()))
    }

    async fn find_element(&self, selector: &str) -> Result<Option<Self>, BrowserError> {
        Ok(lookup(self.0.find_element(selector).await, selector)?.map(Self))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Self>, BrowserError> {
        Ok(lookup_all(self.0.find_elements(selector).await, selector)?
            .into_iter()
            .map(Self)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.viewport_width, DEFAULT_VIEWPORT_WIDTH);
        assert_eq!(config.viewport_height, DEFAULT_VIEWPORT_HEIGHT);
        assert!(config.headless);
        assert!(config.executable.is_none());
    }

    #[test]
    fn test_launch_args_leave_headless_flags_to_builder() {
        assert!(LAUNCH_ARGS.iter().all(|arg| arg.starts_with("--")));
        assert!(!LAUNCH_ARGS.iter().any(|arg| arg.starts_with("--headless")));
        assert!(!LAUNCH_ARGS.contains(&"--mute-audio"));
    }

    #[test]
    fn test_not_found_is_not_a_transport_error() {
        let result: Result<Option<u8>, BrowserError> = lookup(Err(CdpError::NotFound), "time");
        assert!(matches!(result, Ok(None)));

        let result: Result<Option<u8>, BrowserError> = lookup(Err(CdpError::Timeout), "time");
        assert!(matches!(result, Err(BrowserError::Lookup { .. })));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_session_reads_dom() {
        let session = ChromiumSession::launch(&SessionConfig::default())
            .await
            .expect("failed to launch browser");

        session
            .navigate("data:text/html,<time datetime=\"2017-01-01T00:00:00Z\">x</time>")
            .await
            .expect("navigation failed");

        let time = session
            .find_element(Locator::Css("time"))
            .await
            .expect("lookup failed")
            .expect("time element missing");
        assert_eq!(
            time.attribute("datetime").await.unwrap().as_deref(),
            Some("2017-01-01T00:00:00Z")
        );
        assert!(session
            .find_element(Locator::Css("video"))
            .await
            .unwrap()
            .is_none());

        session.close().await;
    }
}
