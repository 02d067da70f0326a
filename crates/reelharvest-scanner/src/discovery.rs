//! Listing discovery: collect item URLs from a hashtag listing by scrolling.
//!
//! A crawl stops when the requested number of items is reached or after a
//! run of passes that found nothing new. Several queries can share one
//! overall target through [`ListingCrawler::discover_all`], which inflates
//! per-query limits and trims the combined result to the exact target.

use crate::error::Result;
use crate::pacing::{pause, pixels};
use reelharvest_browser::{extract_domain, BrowserSession, SessionFactory, WaitStrategy};
use reelharvest_core::{AppConfig, DelayRange, DiscoveryConfig, PlatformConfig};
use reelharvest_proxy::ProxySource;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Selector awaited after the listing loads.
pub const ITEM_LINK_SELECTOR: &str = r#"a[href*="/video/"]"#;

/// Link selectors from most to least specific. The first one that yields
/// item links is used for the pass.
pub const LINK_STRATEGIES: &[&str] = &[
    r#"a[href*="/video/"]"#,
    r#"a[data-e2e="challenge-item"]"#,
    r#"div[data-e2e="challenge-item-list"] a"#,
    r#"a[href*="/@"]"#,
];

const WARM_UP_SETTLE: DelayRange = DelayRange::new(800, 1500);
const WARM_UP_AFTER_SCROLL: DelayRange = DelayRange::new(400, 800);
const LISTING_SETTLE: DelayRange = DelayRange::new(2000, 3000);
const SCROLL_SETTLE: DelayRange = DelayRange::new(500, 1000);
const PASS_PAUSE: DelayRange = DelayRange::new(300, 700);

/// Insertion-ordered set of discovered item URLs.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredUrlSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl DiscoveredUrlSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a URL; false if it was already present.
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    pub fn clear(&mut self) {
        self.urls.clear();
        self.seen.clear();
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// Consecutive empty passes tolerated before giving up.
#[must_use]
pub fn stagnation_limit(max_items: Option<usize>) -> u32 {
    match max_items {
        Some(n) if n >= 100 => 10,
        Some(n) if n >= 50 => 8,
        _ => 5,
    }
}

/// Per-query item limit when `query_count` queries share `total`.
///
/// The trailing `tail_queries` queries chase the remaining deficit plus a
/// buffer; earlier ones take an inflated even split.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn query_limit(
    total: usize,
    query_count: usize,
    index: usize,
    collected: usize,
    config: &DiscoveryConfig,
) -> usize {
    let remaining = total.saturating_sub(collected);

    if query_count.saturating_sub(index) <= config.tail_queries {
        remaining + (remaining as f64 * config.tail_buffer).floor() as usize
    } else if query_count > 1 {
        (total as f64 / query_count as f64 * config.buffer_factor).floor() as usize
    } else {
        total
    }
}

/// Deduplicate preserving first-seen order, then cut to `total`.
#[must_use]
pub fn finalize(urls: Vec<String>, total: Option<usize>) -> Vec<String> {
    let mut set = DiscoveredUrlSet::new();
    for url in urls {
        set.insert(url);
    }

    let mut urls = set.into_vec();
    if let Some(total) = total {
        if urls.len() > total {
            info!(collected = urls.len(), total, "trimming discovered URLs");
            urls.truncate(total);
        }
    }
    urls
}

/// Keep item links on the platform domain, without query strings.
#[must_use]
pub fn normalize_item_link(href: &str, platform_domain: &str) -> Option<String> {
    if !href.contains("/video/") || !href.contains(platform_domain) {
        return None;
    }
    href.split('?').next().map(ToString::to_string)
}

fn reached(found: &DiscoveredUrlSet, max_items: Option<usize>) -> bool {
    max_items.is_some_and(|max| found.len() >= max)
}

/// Hashtag listing crawler.
#[derive(Debug, Clone)]
pub struct ListingCrawler {
    platform: PlatformConfig,
    platform_domain: String,
    discovery: DiscoveryConfig,
}

impl ListingCrawler {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let base = &config.platform.base_url;
        let platform_domain = extract_domain(base)
            .map(|host| host.trim_start_matches("www.").to_string())
            .unwrap_or_else(|_| base.clone());

        Self {
            platform: config.platform.clone(),
            platform_domain,
            discovery: config.discovery.clone(),
        }
    }

    /// Collect up to `max_items` item URLs for one query.
    ///
    /// Never fails: problems are logged and whatever was collected so far is
    /// returned.
    pub async fn discover<S>(&self, session: &S, query: &str, max_items: Option<usize>) -> Vec<String>
    where
        S: BrowserSession + ?Sized,
    {
        let mut found = DiscoveredUrlSet::new();
        if max_items == Some(0) {
            return found.into_vec();
        }

        self.warm_up(session).await;

        if let Err(e) = self.crawl(session, query, max_items, &mut found).await {
            warn!(query = %query, error = %e, "listing crawl stopped early");
        }

        if found.is_empty() {
            if let Err(e) = self.save_snapshot(session, query).await {
                warn!(query = %query, error = %e, "could not save debug snapshot");
            }
        }

        info!(query = %query, count = found.len(), "discovered item URLs");
        found.into_vec()
    }

    /// Run several queries against one overall target.
    ///
    /// Each query gets its own proxy and session. Only proxy exhaustion is
    /// an error; a query whose session cannot be opened is skipped.
    pub async fn discover_all<F>(
        &self,
        factory: &F,
        proxies: &dyn ProxySource,
        queries: &[String],
        total: Option<usize>,
    ) -> Result<Vec<String>>
    where
        F: SessionFactory + ?Sized,
    {
        let mut combined = Vec::new();
        let mut unique: HashSet<String> = HashSet::new();

        for (index, query) in queries.iter().enumerate() {
            if total.is_some_and(|t| unique.len() >= t) {
                info!(collected = unique.len(), "overall target reached, skipping remaining queries");
                break;
            }

            let limit = total.map(|t| {
                query_limit(t, queries.len(), index, unique.len(), &self.discovery)
            });
            let proxy = proxies.next()?;
            info!(query = %query, proxy = %proxy, limit = ?limit, "discovering");

            let session = match factory.create_session(&proxy).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(query = %query, proxy = %proxy, error = %e, "could not open session");
                    proxies.mark_failed(&proxy);
                    continue;
                }
            };

            let urls = self.discover(&session, query, limit).await;
            factory.close_session(session).await;

            for url in urls {
                unique.insert(url.clone());
                combined.push(url);
            }
        }

        let urls = finalize(combined, total);
        if let Some(total) = total {
            if urls.len() < total {
                warn!(collected = urls.len(), total, "fewer items available than requested");
            }
        }
        Ok(urls)
    }

    async fn warm_up<S>(&self, session: &S)
    where
        S: BrowserSession + ?Sized,
    {
        let result: Result<()> = async {
            session
                .navigate(
                    &self.platform.base_url,
                    WaitStrategy::ContentLoaded,
                    self.listing_timeout(),
                )
                .await?;
            pause(session, WARM_UP_SETTLE).await?;
            session.scroll_by(pixels(200, 400)).await?;
            pause(session, WARM_UP_AFTER_SCROLL).await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "landing page warm-up failed");
        }
    }

    async fn crawl<S>(
        &self,
        session: &S,
        query: &str,
        max_items: Option<usize>,
        found: &mut DiscoveredUrlSet,
    ) -> Result<()>
    where
        S: BrowserSession + ?Sized,
    {
        let listing_url = self.platform.listing_url(query);
        session
            .navigate(&listing_url, WaitStrategy::NetworkIdle, self.listing_timeout())
            .await?;
        pause(session, LISTING_SETTLE).await?;

        let selector_wait = Duration::from_millis(self.discovery.selector_wait_ms);
        if let Err(e) = session.wait_for_selector(ITEM_LINK_SELECTOR, selector_wait).await {
            debug!(query = %query, error = %e, "no item links yet, scrolling anyway");
        }

        let limit = stagnation_limit(max_items);
        let mut stagnant = 0;
        let mut scrolls: u32 = 0;

        loop {
            if reached(found, max_items) {
                break;
            }

            let before = found.len();
            if let Err(e) = self.harvest(session, max_items, found).await {
                warn!(query = %query, error = %e, "link harvest failed");
            }

            if reached(found, max_items) {
                info!(query = %query, count = found.len(), "item limit reached");
                break;
            }

            if found.len() == before {
                stagnant += 1;
                debug!(query = %query, attempt = stagnant, limit, "no new items");
                if stagnant >= limit {
                    info!(query = %query, count = found.len(), "listing stopped yielding items");
                    break;
                }
            } else {
                stagnant = 0;
            }

            scrolls += 1;
            if let Err(e) = self.scroll(session, scrolls).await {
                warn!(query = %query, error = %e, "scroll failed");
            }
            pause(session, PASS_PAUSE).await?;
        }

        Ok(())
    }

    async fn harvest<S>(
        &self,
        session: &S,
        max_items: Option<usize>,
        found: &mut DiscoveredUrlSet,
    ) -> Result<()>
    where
        S: BrowserSession + ?Sized,
    {
        let mut links = Vec::new();
        for selector in LINK_STRATEGIES {
            links = session
                .query_links(selector)
                .await?
                .iter()
                .filter_map(|href| normalize_item_link(href, &self.platform_domain))
                .collect();
            if !links.is_empty() {
                break;
            }
        }

        for link in links {
            if reached(found, max_items) {
                break;
            }
            found.insert(link);
        }
        Ok(())
    }

    async fn scroll<S>(&self, session: &S, scroll_count: u32) -> Result<()>
    where
        S: BrowserSession + ?Sized,
    {
        let distance = if scroll_count % 3 == 0 {
            pixels(800, 1200)
        } else {
            pixels(300, 600)
        };
        session.scroll_by(distance).await?;
        pause(session, SCROLL_SETTLE).await
    }

    async fn save_snapshot<S>(&self, session: &S, query: &str) -> Result<()>
    where
        S: BrowserSession + ?Sized,
    {
        let Some(dir) = &self.discovery.debug_snapshot_dir else {
            return Ok(());
        };

        let name: String = query
            .trim_start_matches('#')
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        tokio::fs::create_dir_all(dir).await?;

        let png = snapshot_path(dir, &name, "png");
        tokio::fs::write(&png, session.screenshot().await?).await?;

        let html = snapshot_path(dir, &name, "html");
        tokio::fs::write(&html, session.content().await?).await?;

        warn!(query = %query, dir = %dir.display(), "no items found, saved debug snapshot");
        Ok(())
    }

    fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery.listing_timeout_ms)
    }
}

fn snapshot_path(dir: &std::path::Path, name: &str, ext: &str) -> PathBuf {
    dir.join(format!("debug_{name}.{ext}"))
}
