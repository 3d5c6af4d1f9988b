//! Shared headless-browser session with a bounded pool of reusable tabs.
//!
//! One Chromium process serves all page work. Tabs are opened once, checked
//! out for a single navigation, cleaned up, and returned, so concurrent
//! renders are bounded by the pool size instead of spawning a browser (or
//! even a tab) per request. The browser launches lazily on first use;
//! concurrent first users share a single launch.

pub mod config;
pub mod pool;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::app::{Result, TributaryError};

pub use config::{ScrollMode, SessionConfig};
pub use pool::{CleanupPlan, ResourcePool, TabState};

/// Handle to the shared browser and its tab pool.
///
/// The owner creates the session, passes it to whatever needs rendered
/// pages, and disposes of it with [`BrowserSession::close`]. Work started
/// before `close` completes normally; everything after fails with
/// [`TributaryError::SessionClosed`].
pub struct BrowserSession {
    config: SessionConfig,
    inner: OnceCell<SessionInner>,
    closed: AtomicBool,
}

struct SessionInner {
    browser: tokio::sync::Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    pool: ResourcePool<Tab>,
}

impl SessionInner {
    /// Release everything the session holds. Safe to run more than once;
    /// the browser handle leaves its slot on the first pass.
    async fn shutdown(&self) {
        self.pool.close();

        let mut slot = self.browser.lock().await;
        if let Some(mut browser) = slot.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Browser close failed: {}", e);
            }
            let _ = browser.wait().await;
        }

        self.handler_task.abort();
    }
}

struct Tab {
    page: Page,
    state: TabState,
}

impl Tab {
    fn new(page: Page) -> Self {
        Self {
            page,
            state: TabState::default(),
        }
    }

    /// Post-use bookkeeping before the tab goes back into the pool. Never
    /// fails: a tab that could not be reset is still better returned than
    /// leaked.
    async fn cleanup(&mut self, url: &str, config: &SessionConfig) {
        let plan = self.state.after_use(url, config.max_navigations_per_tab);
        if plan.needs_reset() {
            self.soft_reset(config).await;
        }

        // Only effective when Chromium runs with --js-flags=--expose-gc.
        let _ = self.page.evaluate("if (window.gc) { window.gc(); }").await;
    }

    async fn soft_reset(&self, config: &SessionConfig) {
        match timeout(config.navigation_timeout(), self.page.goto("about:blank")).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Tab reset failed: {}", e),
            Err(_) => tracing::warn!("Tab reset timed out"),
        }
    }
}

/// Returns the tab to the pool on drop, so an error or cancellation inside
/// the borrowing task cannot shrink pool capacity.
struct TabGuard<'a> {
    pool: &'a ResourcePool<Tab>,
    tab: Option<Tab>,
}

impl Drop for TabGuard<'_> {
    fn drop(&mut self) {
        if let Some(tab) = self.tab.take() {
            self.pool.release(tab);
        }
    }
}

impl BrowserSession {
    /// Create a session handle. The browser itself is not launched until
    /// the first page of work arrives.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    async fn inner(&self) -> Result<&SessionInner> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TributaryError::SessionClosed);
        }
        let inner = self.inner.get_or_try_init(|| launch(&self.config)).await?;
        // A close() that raced the launch found nothing to tear down, so
        // the launching side disposes of its own fresh browser.
        if self.closed.load(Ordering::SeqCst) {
            inner.shutdown().await;
            return Err(TributaryError::SessionClosed);
        }
        Ok(inner)
    }

    /// Check a tab out of the pool and run `f` on its page. The tab is
    /// cleaned up and returned afterwards, also when `f` fails; `url` feeds
    /// the per-tab host tracking that decides whether a reset is due.
    pub async fn run<F, Fut, T>(&self, url: &str, f: F) -> Result<T>
    where
        F: FnOnce(Page) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let inner = self.inner().await?;
        let tab = inner.pool.acquire().await?;
        let page = tab.page.clone();
        let mut guard = TabGuard {
            pool: &inner.pool,
            tab: Some(tab),
        };

        let result = f(page).await;

        if let Some(tab) = guard.tab.as_mut() {
            tab.cleanup(url, &self.config).await;
        }

        result
    }

    /// Navigate a pooled tab to `url` and return the rendered document.
    ///
    /// With `wait_selector` the capture is delayed (bounded by the selector
    /// timeout) until the selector matches; without one a fixed settle delay
    /// runs instead. The configured scroll behavior runs before capture to
    /// trigger lazy-loaded content.
    pub async fn goto_and_fetch(&self, url: &str, wait_selector: Option<&str>) -> Result<String> {
        let config = self.config.clone();
        let target = url.to_string();

        self.run(url, move |page| async move {
            navigate(&page, &target, &config).await?;

            match wait_selector {
                Some(selector) => wait_for_selector(&page, selector, &config).await,
                None => tokio::time::sleep(config.render_settle()).await,
            }

            scroll(&page, &config).await;

            page.content().await.map_err(|e| {
                TributaryError::Browser(format!("Failed to read content of {}: {}", target, e))
            })
        })
        .await
    }

    /// Number of tabs currently idle in the pool. Zero before the browser
    /// has launched and after close.
    pub fn available_tabs(&self) -> usize {
        if self.closed.load(Ordering::SeqCst) {
            return 0;
        }
        self.inner
            .get()
            .map(|inner| inner.pool.available())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shut the session down: pending pool waiters fail, the browser exits,
    /// the event handler stops. Idempotent; later calls return immediately.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(inner) = self.inner.get() {
            inner.shutdown().await;
        }

        Ok(())
    }
}

async fn launch(config: &SessionConfig) -> Result<SessionInner> {
    let mut builder = BrowserConfig::builder()
        .arg("--no-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-software-rasterizer");

    if !config.headless {
        builder = builder.with_head();
    }

    let browser_config = builder
        .build()
        .map_err(|e| TributaryError::Browser(format!("Failed to build browser config: {}", e)))?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        TributaryError::Browser(format!(
            "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
            e
        ))
    })?;

    // Drive browser IO for the lifetime of the session.
    let handler_task = tokio::spawn(async move {
        while let Some(_event) = handler.next().await {}
    });

    let target = config.max_tabs.max(1);
    let mut pages = Vec::with_capacity(target);

    // Chromium starts with one blank tab; adopt it rather than leaking it.
    let existing = browser
        .pages()
        .await
        .map_err(|e| TributaryError::Browser(format!("Failed to list pages: {}", e)))?;
    if let Some(page) = existing.into_iter().next() {
        pages.push(page);
    }

    while pages.len() < target {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| TributaryError::Browser(format!("Failed to open tab: {}", e)))?;
        pages.push(page);
    }

    if let Some(ref ua) = config.user_agent {
        for page in &pages {
            page.set_user_agent(ua)
                .await
                .map_err(|e| TributaryError::Browser(format!("Failed to set user agent: {}", e)))?;
        }
    }

    tracing::debug!("Browser session ready with {} tabs", pages.len());

    let pool = ResourcePool::new(pages.into_iter().map(Tab::new).collect());

    Ok(SessionInner {
        browser: tokio::sync::Mutex::new(Some(browser)),
        handler_task,
        pool,
    })
}

async fn navigate(page: &Page, url: &str, config: &SessionConfig) -> Result<()> {
    timeout(config.navigation_timeout(), page.goto(url))
        .await
        .map_err(|_| TributaryError::Browser(format!("Navigation to {} timed out", url)))?
        .map_err(|e| TributaryError::Browser(format!("Navigation to {} failed: {}", url, e)))?;

    // Wait for the load event too, but do not fail the capture over it.
    let _ = timeout(config.navigation_timeout(), page.wait_for_navigation()).await;

    Ok(())
}

/// Poll for `selector` until it matches or the selector timeout elapses.
/// Capture proceeds either way; a missing selector is not an error.
async fn wait_for_selector(page: &Page, selector: &str, config: &SessionConfig) {
    let deadline = tokio::time::Instant::now() + config.selector_timeout();

    loop {
        if page.find_element(selector).await.is_ok() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::debug!("Selector {:?} did not appear before capture", selector);
            return;
        }
        tokio::time::sleep(config.poll_interval()).await;
    }
}

async fn scroll(page: &Page, config: &SessionConfig) {
    match config.scroll_mode {
        ScrollMode::None => {}
        ScrollMode::Bottom => {
            let _ = page
                .evaluate("window.scrollTo(0, document.body.scrollHeight);")
                .await;
            tokio::time::sleep(config.scroll_settle()).await;
        }
        ScrollMode::Full => {
            for _ in 0..config.max_scroll_steps {
                let at_bottom = page
                    .evaluate(format!(
                        "window.scrollBy(0, {}); \
                         (window.innerHeight + window.scrollY) >= document.body.scrollHeight",
                        config.scroll_step
                    ))
                    .await
                    .ok()
                    .and_then(|result| result.into_value::<bool>().ok())
                    .unwrap_or(true);

                tokio::time::sleep(config.scroll_settle()).await;

                if at_bottom {
                    break;
                }
            }

            let _ = page.evaluate("window.scrollTo(0, 0);").await;
            tokio::time::sleep(config.scroll_settle()).await;
        }
    }
}
