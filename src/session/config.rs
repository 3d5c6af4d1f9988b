use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a rendered page is scrolled before its content is captured.
///
/// Lazy-loading pages often only materialize images and late content once
/// they enter the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    /// Capture the page as loaded.
    None,
    /// Jump straight to the bottom once, then capture.
    Bottom,
    /// Step through the page viewport by viewport, then return to the top.
    Full,
}

/// Configuration for the shared browser session and its tab pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of reusable tabs in the pool (default: 5)
    pub max_tabs: usize,

    /// Navigations a tab serves before it is reset (default: 50)
    pub max_navigations_per_tab: u32,

    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// User agent string applied to every pooled tab
    pub user_agent: Option<String>,

    /// Navigation timeout in milliseconds (default: 10000)
    pub navigation_timeout_ms: u64,

    /// How long to wait for a requested selector to appear, in milliseconds
    /// (default: 5000)
    pub selector_timeout_ms: u64,

    /// Interval between selector polls in milliseconds (default: 200)
    pub poll_interval_ms: u64,

    /// Pause after each scroll step in milliseconds (default: 300)
    pub scroll_settle_ms: u64,

    /// Wait after navigation when no selector is requested, in milliseconds
    /// (default: 1000)
    pub render_settle_ms: u64,

    /// Scroll behavior before capture (default: bottom)
    pub scroll_mode: ScrollMode,

    /// Pixels per scroll step in full mode (default: 500)
    pub scroll_step: u32,

    /// Upper bound on scroll steps in full mode (default: 10)
    pub max_scroll_steps: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_tabs: 5,
            max_navigations_per_tab: 50,
            headless: true,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            navigation_timeout_ms: 10_000,
            selector_timeout_ms: 5_000,
            poll_interval_ms: 200,
            scroll_settle_ms: 300,
            render_settle_ms: 1_000,
            scroll_mode: ScrollMode::Bottom,
            scroll_step: 500,
            max_scroll_steps: 10,
        }
    }
}

impl SessionConfig {
    /// Get the navigation timeout as a Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Get the selector wait timeout as a Duration
    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    /// Get the selector poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the post-scroll settle time as a Duration
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    /// Get the post-navigation settle time as a Duration
    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }
}
