//! Scripted in-memory browser used by the scanner integration tests.
//!
//! A [`Site`] maps URLs to canned pages. Selector queries are answered by
//! parsing the page HTML with `scraper`, scrolling advances a page to its
//! next frame, and waits return immediately.

#![allow(dead_code)]

use async_trait::async_trait;
use reelharvest_browser::{BrowserError, BrowserSession, SessionFactory, WaitStrategy};
use reelharvest_core::ProxyEndpoint;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// One URL's content. Each frame is the full DOM after that many scrolls.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub frames: Vec<String>,
    pub payload: Value,
}

impl Page {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            frames: vec![html.into()],
            payload: Value::Null,
        }
    }

    pub fn scrolling(frames: Vec<String>) -> Self {
        Self {
            frames,
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Canned pages plus URLs whose navigation fails.
#[derive(Debug, Default)]
pub struct Site {
    pages: HashMap<String, Page>,
    broken: HashSet<String>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct SessionState {
    url: String,
    frame: usize,
}

/// A session over a [`Site`], optionally routed through a dead proxy.
pub struct ScriptedSession {
    site: Arc<Site>,
    proxy: String,
    dead_proxy: bool,
    state: Mutex<SessionState>,
    log: Arc<Log>,
}

impl ScriptedSession {
    fn current_html(&self) -> String {
        let state = self.state.lock().expect("acquire session state");
        self.site
            .pages
            .get(&state.url)
            .and_then(|page| {
                page.frames
                    .get(state.frame.min(page.frames.len().saturating_sub(1)))
                    .cloned()
            })
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }

    fn select<R>(&self, selector: &str, f: impl FnOnce(&Html, &Selector) -> R) -> BrowserResult<R> {
        let selector = Selector::parse(selector)
            .map_err(|e| BrowserError::SelectorNotFound(format!("{selector}: {e:?}")))?;
        let html = Html::parse_document(&self.current_html());
        Ok(f(&html, &selector))
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&self, url: &str, _wait: WaitStrategy, _timeout: Duration) -> BrowserResult<()> {
        self.log.navigations.lock().expect("acquire log").push(url.to_string());

        if self.dead_proxy {
            return Err(BrowserError::NavigationError(format!(
                "proxy {} refused connection",
                self.proxy
            )));
        }
        if self.site.broken.contains(url) {
            return Err(BrowserError::Timeout(format!("loading {url}")));
        }

        let mut state = self.state.lock().expect("acquire session state");
        state.url = url.to_string();
        state.frame = 0;
        Ok(())
    }

    async fn evaluate_script(&self, _script: &str) -> BrowserResult<Value> {
        let state = self.state.lock().expect("acquire session state");
        Ok(self
            .site
            .pages
            .get(&state.url)
            .map(|page| page.payload.clone())
            .unwrap_or(Value::Null))
    }

    async fn query_text(&self, selector: &str) -> BrowserResult<Option<String>> {
        self.select(selector, |html, sel| {
            html.select(sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
    }

    async fn query_attribute(
        &self,
        selector: &str,
        attributes: &[&str],
    ) -> BrowserResult<Option<String>> {
        self.select(selector, |html, sel| {
            html.select(sel).next().and_then(|el| {
                attributes
                    .iter()
                    .filter_map(|name| el.value().attr(name))
                    .find(|value| !value.is_empty())
                    .map(ToString::to_string)
            })
        })
    }

    async fn query_links(&self, selector: &str) -> BrowserResult<Vec<String>> {
        self.select(selector, |html, sel| {
            html.select(sel)
                .filter_map(|el| el.value().attr("href"))
                .map(ToString::to_string)
                .collect()
        })
    }

    async fn scroll_by(&self, _pixels: i64) -> BrowserResult<()> {
        self.log.scrolls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().expect("acquire session state").frame += 1;
        Ok(())
    }

    async fn wait(&self, duration: Duration) -> BrowserResult<()> {
        self.log.waits.lock().expect("acquire log").push(duration);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> BrowserResult<()> {
        let found = self.select(selector, |html, sel| html.select(sel).next().is_some())?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::Timeout(format!("waiting for {selector}")))
        }
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.current_html())
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }
}

/// What the factory and its sessions did.
#[derive(Debug, Default)]
pub struct Log {
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
    /// Sessions currently open.
    pub open: AtomicUsize,
    /// Most sessions ever open at once.
    pub peak_open: AtomicUsize,
    pub scrolls: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub waits: Mutex<Vec<Duration>>,
    pub proxies: Mutex<Vec<String>>,
}

impl Log {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().expect("acquire log").clone()
    }

    pub fn proxies(&self) -> Vec<String> {
        self.proxies.lock().expect("acquire log").clone()
    }
}

/// Factory handing out [`ScriptedSession`]s.
pub struct ScriptedFactory {
    site: Arc<Site>,
    dead: HashSet<String>,
    unopenable: HashSet<String>,
    pub log: Arc<Log>,
}

impl ScriptedFactory {
    pub fn new(site: Site) -> Self {
        Self {
            site: Arc::new(site),
            dead: HashSet::new(),
            unopenable: HashSet::new(),
            log: Arc::new(Log::default()),
        }
    }

    /// Sessions through this proxy open but every navigation fails.
    pub fn dead_proxy(mut self, proxy: &ProxyEndpoint) -> Self {
        self.dead.insert(proxy.key());
        self
    }

    /// Sessions through this proxy cannot be opened at all.
    pub fn unopenable_proxy(mut self, proxy: &ProxyEndpoint) -> Self {
        self.unopenable.insert(proxy.key());
        self
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    async fn create_session(&self, proxy: &ProxyEndpoint) -> BrowserResult<ScriptedSession> {
        self.log.proxies.lock().expect("acquire log").push(proxy.key());
        if self.unopenable.contains(&proxy.key()) {
            return Err(BrowserError::ChromiumError(format!(
                "could not create context for {proxy}"
            )));
        }

        self.log.created.fetch_add(1, Ordering::SeqCst);
        let open = self.log.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak_open.fetch_max(open, Ordering::SeqCst);
        Ok(ScriptedSession {
            site: Arc::clone(&self.site),
            proxy: proxy.key(),
            dead_proxy: self.dead.contains(&proxy.key()),
            state: Mutex::new(SessionState::default()),
            log: Arc::clone(&self.log),
        })
    }

    async fn close_session(&self, _session: ScriptedSession) {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        self.log.open.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn proxy(n: u8) -> ProxyEndpoint {
    ProxyEndpoint::new(format!("10.0.0.{n}"), 8080, "user", "pass")
}

/// Item page markup with the usual `data-e2e` hooks.
pub fn item_html(caption: &str, likes: &str, username: &str) -> String {
    format!(
        r#"<html><body>
            <div data-e2e="video-desc">{caption}</div>
            <strong data-e2e="like-count">{likes}</strong>
            <strong data-e2e="comment-count">87</strong>
            <strong data-e2e="share-count">Share</strong>
            <strong data-e2e="undefined-count">1,204</strong>
            <span data-e2e="video-author-uniqueid">{username}</span>
            <span data-e2e="browser-nickname">Nick</span><span>2024-3-1</span>
            <video poster="https://cdn.example/cover.jpg"></video>
        </body></html>"#
    )
}

/// Profile page markup with a bio and outbound links.
pub fn profile_html(bio: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">link</a>"#))
        .collect();
    format!(
        r#"<html><body>
            <h2 data-e2e="user-bio">{bio}</h2>
            {anchors}
        </body></html>"#
    )
}

/// Rehydration payload for one item.
pub fn item_payload(caption: &str, username: &str, likes: u64) -> Value {
    serde_json::json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": {
                "itemInfo": {
                    "itemStruct": {
                        "desc": caption,
                        "stats": { "diggCount": likes, "commentCount": 12, "shareCount": "1.2K" },
                        "author": { "uniqueId": username },
                        "createTime": 1_700_000_000,
                        "video": { "cover": "https://cdn.example/payload.jpg" },
                        "challenges": [ { "title": "fitness" } ]
                    }
                }
            }
        }
    })
}

/// Infinite-scroll listing: frame `k` holds the first `(k + 1) * per_frame`
/// items, each linked with a tracking query string.
pub fn growing_listing(prefix: &str, total: usize, per_frame: usize) -> Page {
    let frames = (1..=total.div_ceil(per_frame))
        .map(|k| {
            let anchors: String = (0..(k * per_frame).min(total))
                .map(|i| {
                    format!(
                        r#"<a href="https://www.tiktok.com/@u/video/{prefix}{i}?is_from_webapp=1">v</a>"#
                    )
                })
                .collect();
            format!("<html><body>{anchors}</body></html>")
        })
        .collect();
    Page::scrolling(frames)
}

pub fn item_url(prefix: &str, i: usize) -> String {
    format!("https://www.tiktok.com/@u/video/{prefix}{i}")
}
