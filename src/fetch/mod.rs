//! Document fetching over plain HTTP or a rendered browser page.
//!
//! [`Fetcher`] is the seam for plain HTTP retrieval; [`DocumentFetcher`]
//! layers browser routing on top so extraction code asks for "the document
//! at this URL" without caring how it is obtained.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::session::BrowserSession;

pub use http::HttpFetcher;

#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP fetch settings, deserialized from the `[fetch]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Charset assumed for responses that do not declare one.
    pub fallback_charset: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "tributary/0.1.0".to_string(),
            fallback_charset: "utf-8".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Routes document fetches through plain HTTP, or through a shared browser
/// session when one is supplied.
pub struct DocumentFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    session: Option<Arc<BrowserSession>>,
}

impl DocumentFetcher {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        session: Option<Arc<BrowserSession>>,
    ) -> Self {
        Self { fetcher, session }
    }

    /// Fetch `url` as a document. With a browser session the page is
    /// rendered first, and `wait_selector` delays capture until a matching
    /// element appears; over plain HTTP the selector is ignored.
    pub async fn fetch_document(&self, url: &str, wait_selector: Option<&str>) -> Result<String> {
        match &self.session {
            Some(session) => session.goto_and_fetch(url, wait_selector).await,
            None => self.fetcher.fetch(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.user_agent, "tributary/0.1.0");
        assert_eq!(config.fallback_charset, "utf-8");
    }

    #[test]
    fn test_timeout_accessor() {
        let config = FetchConfig {
            timeout_secs: 25,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(25));
    }

    #[test]
    fn test_partial_config_deserialization() {
        let config: FetchConfig = toml::from_str("timeout_secs = 5").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.fallback_charset, "utf-8");
    }

    #[tokio::test]
    async fn test_document_fetcher_uses_http_without_session() {
        struct StaticFetcher;

        #[async_trait]
        impl Fetcher for StaticFetcher {
            async fn fetch(&self, _url: &str) -> Result<String> {
                Ok("<html></html>".to_string())
            }
        }

        let fetcher = DocumentFetcher::new(Arc::new(StaticFetcher), None);
        let body = fetcher
            .fetch_document("http://example.com", Some(".article"))
            .await
            .unwrap();
        assert_eq!(body, "<html></html>");
    }
}
