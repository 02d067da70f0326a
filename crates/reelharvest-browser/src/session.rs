use crate::error::{BrowserError, Result};
use reelharvest_core::ProxyEndpoint;
use serde_json::Value;
use std::time::Duration;

/// Selector matching every anchor with a target.
pub const ALL_LINKS_SELECTOR: &str = "a[href]";

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Wait until the page and its subresources finished loading.
    NetworkIdle,
    /// Wait until the DOM is parsed.
    ContentLoaded,
}

/// One page bound to one proxy, owned by a single task.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL. Fails with `NavigationError` or `Timeout`.
    async fn navigate(&self, url: &str, wait: WaitStrategy, timeout: Duration) -> Result<()>;

    /// Evaluate a script and return its JSON value (`Null` for undefined).
    async fn evaluate_script(&self, script: &str) -> Result<Value>;

    /// Trimmed inner text of the first element matching `selector`.
    async fn query_text(&self, selector: &str) -> Result<Option<String>>;

    /// First non-empty attribute among `attributes` on the first match.
    async fn query_attribute(&self, selector: &str, attributes: &[&str])
        -> Result<Option<String>>;

    /// Absolute `href` of every element matching `selector`.
    async fn query_links(&self, selector: &str) -> Result<Vec<String>>;

    /// Absolute `href` of every anchor on the page.
    async fn query_all_links(&self) -> Result<Vec<String>> {
        self.query_links(ALL_LINKS_SELECTOR).await
    }

    /// Scroll the window vertically.
    async fn scroll_by(&self, pixels: i64) -> Result<()>;

    /// Pause without touching the page.
    async fn wait(&self, duration: Duration) -> Result<()>;

    /// Wait until `selector` matches or the timeout passes.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Serialized DOM.
    async fn content(&self) -> Result<String>;

    /// PNG screenshot of the full page.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// Creates and tears down proxy-scoped sessions.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession + 'static;

    /// Open a session whose traffic leaves through `proxy`.
    async fn create_session(&self, proxy: &ProxyEndpoint) -> Result<Self::Session>;

    /// Release a session. Never fails; problems are logged.
    async fn close_session(&self, session: Self::Session);
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}
