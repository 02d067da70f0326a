//! Scrape orchestrator for running a URL set through proxied sessions.
//!
//! This module provides the [`ScrapeOrchestrator`], which admits one task per
//! URL through a counting gate, gives each task its own proxy and browser
//! session, and retries failed URLs on a different proxy.

use crate::error::{Result, ScanError};
use crate::extractor::{is_item_url, Extractor};
use futures::stream::{FuturesUnordered, StreamExt};
use reelharvest_browser::{BrowserSession, SessionFactory, WaitStrategy};
use reelharvest_core::{AppConfig, ProxyEndpoint, Record, RunSummary, ScrapeResult};
use reelharvest_proxy::{ProxyError, ProxySource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    /// A URL failed and is being retried on another proxy.
    Retrying {
        /// URL being retried
        url: String,
        /// Retry number, starting at 1
        attempt: u32,
        /// Proxy the retry runs through
        proxy: String,
    },
    /// A URL finished, successfully or not.
    Completed(ScrapeResult),
}

/// Orchestrates scraping across many URLs.
pub struct ScrapeOrchestrator<F: SessionFactory> {
    /// Opens and closes proxy-scoped sessions
    factory: Arc<F>,
    /// Hands out proxies and takes failure reports
    proxies: Arc<dyn ProxySource>,
    /// Turns loaded pages into records
    extractor: Extractor,
    /// Retries per URL after the first attempt
    max_retries: u32,
    /// Navigation timeout for target URLs
    request_timeout: Duration,
    /// Optional progress channel
    events: Option<UnboundedSender<ScrapeEvent>>,
}

impl<F: SessionFactory> ScrapeOrchestrator<F> {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(factory: Arc<F>, proxies: Arc<dyn ProxySource>, config: &AppConfig) -> Self {
        Self {
            factory,
            proxies,
            extractor: Extractor::new(config),
            max_retries: config.scraping.max_retries,
            request_timeout: config.scraping.request_timeout(),
            events: None,
        }
    }

    /// Send progress events to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: UnboundedSender<ScrapeEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Set the number of retries per URL.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the extractor built from the configuration.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Scrape every URL with at most `concurrency` tasks running at once.
    ///
    /// Returns one result per input URL, in completion order. Fails only when
    /// no proxy is available before any work starts.
    pub async fn run(&self, urls: &[String], concurrency: usize) -> Result<Vec<ScrapeResult>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        if !self.proxies.has_available() {
            return Err(ScanError::Proxy(ProxyError::Exhausted {
                reason: "no proxies available to start the run".to_string(),
            }));
        }

        let concurrency = concurrency.max(1);
        tracing::info!("Scraping {} URLs with concurrency {}", urls.len(), concurrency);

        let gate = Semaphore::new(concurrency);
        let mut tasks: FuturesUnordered<_> =
            urls.iter().map(|url| self.gated(&gate, url)).collect();

        let mut results = Vec::with_capacity(urls.len());
        while let Some(result) = tasks.next().await {
            self.emit(ScrapeEvent::Completed(result.clone()));
            results.push(result);
        }

        let summary = RunSummary::from_results(&results);
        tracing::info!(
            "Run finished: {} succeeded, {} failed",
            summary.succeeded,
            summary.failed
        );

        Ok(results)
    }

    async fn gated(&self, gate: &Semaphore, url: &str) -> ScrapeResult {
        let _permit = match gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => return failure(url, "", 0, &e),
        };

        match self.proxies.next() {
            Ok(proxy) => self.scrape_one(url, proxy).await,
            Err(e) => {
                tracing::error!("No proxy for {}: {}", url, e);
                failure(url, "", 0, &e)
            }
        }
    }

    /// Scrape one URL starting on `proxy`, retrying on fresh proxies.
    ///
    /// Never fails; errors end up in a [`ScrapeResult::Failure`].
    pub async fn scrape_one(&self, url: &str, proxy: ProxyEndpoint) -> ScrapeResult {
        let mut proxy = proxy;
        let mut retry_count = 0;

        loop {
            let err = match self.attempt(url, &proxy).await {
                Ok(record) => {
                    tracing::debug!("Scraped {} via {}", url, proxy);
                    return ScrapeResult::Success {
                        url: url.to_string(),
                        proxy_used: proxy.key(),
                        retry_count,
                        record,
                    };
                }
                Err(e) => e,
            };

            if retry_count >= self.max_retries {
                tracing::warn!("Giving up on {} after {} retries: {}", url, retry_count, err);
                return failure(url, &proxy.key(), retry_count, &err);
            }

            tracing::warn!("Attempt on {} via {} failed: {}", url, proxy, err);
            self.proxies.mark_failed(&proxy);

            proxy = match self.proxies.next() {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("No proxy left to retry {}: {}", url, e);
                    return failure(url, &proxy.key(), retry_count, &format!("{err}; {e}"));
                }
            };

            retry_count += 1;
            self.emit(ScrapeEvent::Retrying {
                url: url.to_string(),
                attempt: retry_count,
                proxy: proxy.key(),
            });
        }
    }

    /// One attempt: open a session, load the page, extract, always close.
    async fn attempt(&self, url: &str, proxy: &ProxyEndpoint) -> Result<Record> {
        let session = self.factory.create_session(proxy).await?;
        let outcome = self.load_and_extract(&session, url).await;
        self.factory.close_session(session).await;
        outcome
    }

    async fn load_and_extract(&self, session: &F::Session, url: &str) -> Result<Record> {
        session
            .navigate(url, WaitStrategy::ContentLoaded, self.request_timeout)
            .await?;

        if is_item_url(url) {
            self.extractor.extract_item(session, url).await
        } else {
            self.extractor.extract_profile_only(session, url).await
        }
    }

    fn emit(&self, event: ScrapeEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                tracing::debug!("Event receiver dropped");
            }
        }
    }
}

fn failure(url: &str, proxy: &str, retry_count: u32, err: &impl ToString) -> ScrapeResult {
    ScrapeResult::Failure {
        url: url.to_string(),
        proxy_used: proxy.to_string(),
        retry_count,
        error: err.to_string(),
    }
}

