use crate::blocking::BlockPolicy;
use crate::error::{BrowserError, Result};
use crate::session::{BrowserSession, SessionFactory, WaitStrategy};
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams, EventAuthRequired, EventRequestPaused,
    FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use reelharvest_core::{BrowserConfig, ProxyEndpoint};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SETTLE_DELAY: Duration = Duration::from_millis(500);

impl From<CdpError> for BrowserError {
    fn from(err: CdpError) -> Self {
        BrowserError::ChromiumError(err.to_string())
    }
}

/// One launched Chromium shared by all sessions.
///
/// Every session gets its own browser context, so cookies and the proxy
/// setting never leak between tasks.
pub struct ChromiumEngine {
    browser: Arc<Mutex<Browser>>,
    handler: JoinHandle<()>,
    user_agent: String,
    block_policy: BlockPolicy,
}

impl ChromiumEngine {
    /// Launch Chromium with the given settings.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        info!(headless = config.headless, "launching browser");

        let mut builder = ChromeConfig::builder()
            .window_size(config.window_width, config.window_height)
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run");

        if !config.headless {
            builder = builder.with_head();
        }
        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;
        let (browser, mut handler) = Browser::launch(chrome_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler error");
                }
            }
        });

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler,
            user_agent: config.user_agent.clone(),
            block_policy: BlockPolicy::from_config(config),
        })
    }

    /// Close the browser and stop the handler task.
    pub async fn shutdown(self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        self.handler.abort();
    }

    async fn open_page(&self, proxy: &ProxyEndpoint) -> Result<(Page, BrowserContextId)> {
        let browser = self.browser.lock().await;

        let context_params = CreateBrowserContextParams::builder()
            .proxy_server(proxy.server_url())
            .build();
        let context_id = browser
            .execute(context_params)
            .await?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(BrowserError::ChromiumError)?;
        let page = browser.new_page(target).await?;

        Ok((page, context_id))
    }
}

#[async_trait::async_trait]
impl SessionFactory for ChromiumEngine {
    type Session = ChromiumSession;

    async fn create_session(&self, proxy: &ProxyEndpoint) -> Result<ChromiumSession> {
        let (page, context_id) = self.open_page(proxy).await?;

        let setup = async {
            page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
                .await?;
            intercept_requests(&page, proxy, self.block_policy.clone()).await
        };

        match setup.await {
            Ok(listeners) => {
                debug!(proxy = %proxy, "opened browser session");
                Ok(ChromiumSession {
                    page,
                    context_id,
                    listeners,
                })
            }
            Err(e) => {
                self.close_session(ChromiumSession {
                    page,
                    context_id,
                    listeners: Vec::new(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn close_session(&self, session: ChromiumSession) {
        for listener in &session.listeners {
            listener.abort();
        }

        if let Err(e) = session.page.close().await {
            debug!(error = %e, "failed to close page");
        }

        let browser = self.browser.lock().await;
        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(session.context_id))
            .await
        {
            debug!(error = %e, "failed to dispose browser context");
        }
    }
}

/// Pause every request so blocked ones can be failed and proxy auth answered.
async fn intercept_requests(
    page: &Page,
    proxy: &ProxyEndpoint,
    policy: BlockPolicy,
) -> Result<Vec<JoinHandle<()>>> {
    let mut paused = page.event_listener::<EventRequestPaused>().await?;
    let mut auth = page.event_listener::<EventAuthRequired>().await?;

    let paused_page = page.clone();
    let paused_task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let blocked = policy.should_block(event.resource_type.as_ref(), &event.request.url);
            let outcome = if blocked {
                paused_page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
            } else {
                paused_page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = outcome {
                debug!(url = %event.request.url, error = %e, "failed to resolve paused request");
            }
        }
    });

    let auth_page = page.clone();
    let (username, password) = (proxy.username.clone(), proxy.password.clone());
    let auth_task = tokio::spawn(async move {
        while let Some(event) = auth.next().await {
            let response = AuthChallengeResponse::builder()
                .response(AuthChallengeResponseResponse::ProvideCredentials)
                .username(username.clone())
                .password(password.clone())
                .build();
            let Ok(response) = response else {
                continue;
            };
            if let Err(e) = auth_page
                .execute(ContinueWithAuthParams::new(
                    event.request_id.clone(),
                    response,
                ))
                .await
            {
                warn!(error = %e, "failed to answer proxy auth challenge");
            }
        }
    });

    page.execute(EnableParams {
        patterns: Some(vec![RequestPattern {
            url_pattern: Some("*".to_string()),
            resource_type: None,
            request_stage: Some(RequestStage::Request),
        }]),
        handle_auth_requests: Some(true),
    })
    .await?;

    Ok(vec![paused_task, auth_task])
}

/// A page inside its own browser context.
pub struct ChromiumSession {
    page: Page,
    context_id: BrowserContextId,
    listeners: Vec<JoinHandle<()>>,
}

impl ChromiumSession {
    async fn wait_for_ready_state(&self, wait: WaitStrategy) -> Result<()> {
        loop {
            let state = self.evaluate_script("document.readyState").await?;
            let ready = match (wait, state.as_str()) {
                (_, Some("complete")) => true,
                (WaitStrategy::ContentLoaded, Some("interactive")) => true,
                _ => false,
            };
            if ready {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Embed a Rust string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    Value::from(s).to_string()
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str, wait: WaitStrategy, timeout: Duration) -> Result<()> {
        debug!(url = %url, ?wait, "navigating");

        let load = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
            self.wait_for_ready_state(wait).await
        };

        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BrowserError::Timeout(format!(
                    "navigation to {url} exceeded {}ms",
                    timeout.as_millis()
                )))
            }
        }

        if wait == WaitStrategy::NetworkIdle {
            tokio::time::sleep(SETTLE_DELAY).await;
        }
        Ok(())
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn query_text(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return null; \
             const t = (el.innerText || el.textContent || '').trim(); \
             return t.length ? t : null; }})()",
            js_string(selector)
        );
        let value = self.evaluate_script(&script).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    async fn query_attribute(
        &self,
        selector: &str,
        attributes: &[&str],
    ) -> Result<Option<String>> {
        let names = Value::from(attributes.to_vec()).to_string();
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return null; \
             for (const name of {names}) {{ const v = el.getAttribute(name); \
             if (v && v.trim().length) return v.trim(); }} \
             return null; }})()",
            js_string(selector)
        );
        let value = self.evaluate_script(&script).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    async fn query_links(&self, selector: &str) -> Result<Vec<String>> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(a => a.href).filter(Boolean)",
            js_string(selector)
        );
        let value = self.evaluate_script(&script).await?;
        Ok(value
            .as_array()
            .map(|links| {
                links
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.evaluate_script(&format!("window.scrollBy(0, {pixels})"))
            .await
            .map(|_| ())
    }

    async fn wait(&self, duration: Duration) -> Result<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::SelectorNotFound(selector.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await?)
    }
}
