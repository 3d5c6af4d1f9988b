//! Feed extraction engines.
//!
//! Two engines share one item model: the structured engine walks RSS 2.0
//! and Atom documents tag by tag, and the generic engine runs CSS rules
//! over arbitrary HTML listing pages. [`Extractor`] is the entry point: it
//! routes a [`FeedRequest`] to the right engine, launches a browser
//! session when the request asks for rendering, and hands the result to
//! content expansion when a content selector is configured.
//!
//! # Architecture
//!
//! ```text
//! FeedRequest → Extractor → structured | generic → Feed
//!                               │
//!                        DocumentFetcher (HTTP or pooled browser tab)
//!                               │
//!                        ContentExpander → Cache
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tributary::extract::{Extractor, FeedRequest, SourceKind};
//!
//! let extractor = Extractor::new(cache, fetcher, session_config);
//! let feed = extractor
//!     .run(&FeedRequest {
//!         url: "https://example.com/feed.xml".into(),
//!         kind: SourceKind::Structured,
//!         options: Default::default(),
//!     })
//!     .await?;
//! ```

pub mod fields;
pub mod generic;
pub mod structured;
pub mod xml;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::cache::{self, Cache};
use crate::content::ContentExpander;
use crate::domain::{ExtractOptions, Feed};
use crate::fetch::{DocumentFetcher, Fetcher};
use crate::session::{BrowserSession, SessionConfig};

/// Which engine a source runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS 2.0 or Atom document.
    Structured,
    /// Arbitrary HTML listing page, driven by CSS rules.
    Generic,
}

/// One extraction job: a source URL, the engine to use, and its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRequest {
    pub url: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub options: ExtractOptions,
}

pub struct Extractor {
    cache: Arc<dyn Cache + Send + Sync>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    session_config: SessionConfig,
}

impl Extractor {
    pub fn new(
        cache: Arc<dyn Cache + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            cache,
            fetcher,
            session_config,
        }
    }

    /// Run one extraction end to end.
    ///
    /// When the request asks for browser rendering, the session launches
    /// lazily on first navigation and is shut down before this returns,
    /// whatever the outcome.
    pub async fn run(&self, request: &FeedRequest) -> Result<Feed> {
        let session = request
            .options
            .use_browser
            .then(|| Arc::new(BrowserSession::new(self.session_config.clone())));

        let result = self.run_with_session(request, session.clone()).await;

        if let Some(session) = session {
            if let Err(e) = session.close().await {
                tracing::warn!("Browser session shutdown failed: {}", e);
            }
        }

        result
    }

    async fn run_with_session(
        &self,
        request: &FeedRequest,
        session: Option<Arc<BrowserSession>>,
    ) -> Result<Feed> {
        let document_fetcher = DocumentFetcher::new(self.fetcher.clone(), session.clone());

        let mut feed = match request.kind {
            SourceKind::Structured => {
                structured::extract(&request.url, &request.options, &document_fetcher).await?
            }
            SourceKind::Generic => {
                generic::extract(&request.url, &request.options, &document_fetcher).await?
            }
        };

        if request.options.content.is_some() && !feed.items.is_empty() {
            let namespace = cache::content_key("content", &request.url, &request.options)?;
            let expander = ContentExpander::new(self.cache.clone(), self.fetcher.clone());
            feed.items = expander
                .expand(
                    std::mem::take(&mut feed.items),
                    &request.options,
                    &namespace,
                    session.as_deref(),
                )
                .await;
        }

        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::cache::MemoryCache;
    use crate::domain::FieldRule;

    struct MapFetcher {
        bodies: HashMap<String, String>,
    }

    impl MapFetcher {
        fn new(bodies: &[(&str, &str)]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            Ok(self.bodies.get(url).cloned().unwrap_or_default())
        }
    }

    fn extractor_for(bodies: &[(&str, &str)]) -> Extractor {
        Extractor::new(
            Arc::new(MemoryCache::new()),
            Arc::new(MapFetcher::new(bodies)),
            SessionConfig::default(),
        )
    }

    const FEED_URL: &str = "http://example.com/feed.xml";
    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>Example</title>
<item><title>A</title><link>http://example.com/posts/1</link></item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_run_routes_structured_requests() {
        let extractor = extractor_for(&[(FEED_URL, RSS_SAMPLE)]);
        let request = FeedRequest {
            url: FEED_URL.to_string(),
            kind: SourceKind::Structured,
            options: ExtractOptions::default(),
        };

        let feed = extractor.run(&request).await.unwrap();
        assert_eq!(feed.title.as_deref(), Some("Example"));
        assert_eq!(feed.items.len(), 1);
        assert_eq!(
            feed.items[0].link.as_deref(),
            Some("http://example.com/posts/1")
        );
    }

    #[tokio::test]
    async fn test_run_routes_generic_requests() {
        let extractor = extractor_for(&[(
            "http://example.com/blog",
            r#"<html><body><div class="post"><h2>First</h2><a href="/posts/1">read</a></div></body></html>"#,
        )]);

        let mut options = ExtractOptions::default();
        options.item = Some(".post".to_string());
        options.rules.title = Some(FieldRule::from("h2"));
        let request = FeedRequest {
            url: "http://example.com/blog".to_string(),
            kind: SourceKind::Generic,
            options,
        };

        let feed = extractor.run(&request).await.unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title.as_deref(), Some("First"));
        assert_eq!(
            feed.items[0].link.as_deref(),
            Some("http://example.com/posts/1")
        );
    }

    #[tokio::test]
    async fn test_run_expands_content_when_configured() {
        let extractor = extractor_for(&[
            (FEED_URL, RSS_SAMPLE),
            (
                "http://example.com/posts/1",
                "<html><body><article><p>Body</p></article></body></html>",
            ),
        ]);

        let mut options = ExtractOptions::default();
        options.content = Some("article".to_string());
        let request = FeedRequest {
            url: FEED_URL.to_string(),
            kind: SourceKind::Structured,
            options,
        };

        let feed = extractor.run(&request).await.unwrap();
        let item = &feed.items[0];
        assert!(item.description.as_deref().unwrap().contains("Body"));
        assert!(item.content.is_some());
    }

    #[tokio::test]
    async fn test_extraction_errors_propagate() {
        let extractor = extractor_for(&[]);
        let request = FeedRequest {
            url: FEED_URL.to_string(),
            kind: SourceKind::Structured,
            options: ExtractOptions::default(),
        };

        assert!(extractor.run(&request).await.is_err());
    }

    #[test]
    fn test_request_deserializes_with_lowercase_kind() {
        let request: FeedRequest =
            serde_json::from_str(r#"{"url":"http://example.com/feed.xml","kind":"structured"}"#)
                .unwrap();
        assert_eq!(request.kind, SourceKind::Structured);
        assert_eq!(request.options.max_items, 20);

        let request: FeedRequest =
            serde_json::from_str(r#"{"url":"http://example.com/blog","kind":"generic"}"#).unwrap();
        assert_eq!(request.kind, SourceKind::Generic);
    }
}
