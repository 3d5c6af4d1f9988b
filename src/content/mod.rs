//! Full-content expansion for feed items.
//!
//! Listing pages and feeds rarely carry whole articles. When a content
//! selector is configured, each item's link is fetched (over HTTP or
//! through the browser session), the article fragment is extracted and
//! sanitized, and the result is memoized. Expansion is strictly best
//! effort: any failure leaves the original item untouched and uncached, so
//! one broken article never poisons a batch or sticks in the cache.

pub mod sanitize;

use std::sync::Arc;

use futures::future::join_all;
use scraper::{Html, Selector};
use url::Url;

use crate::app::{Result, TributaryError};
use crate::cache::Cache;
use crate::domain::{Attachment, ContentBody, ExtractOptions, FeedItem};
use crate::fetch::Fetcher;
use crate::session::BrowserSession;
use crate::util::collapse_whitespace;

/// Attributes probed, in priority order, for a media element's URL.
const MEDIA_URL_ATTRIBUTES: [&str; 10] = [
    "src",
    "data-src",
    "data-original",
    "data-lazy-src",
    "data-lazy",
    "data-url",
    "data-image",
    "data-img",
    "srcset",
    "data-srcset",
];

pub struct ContentExpander {
    cache: Arc<dyn Cache + Send + Sync>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl ContentExpander {
    pub fn new(
        cache: Arc<dyn Cache + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        Self { cache, fetcher }
    }

    /// Expand every item concurrently. Order is preserved and each item's
    /// outcome is independent of the others.
    pub async fn expand(
        &self,
        items: Vec<FeedItem>,
        options: &ExtractOptions,
        namespace: &str,
        session: Option<&BrowserSession>,
    ) -> Vec<FeedItem> {
        join_all(
            items
                .into_iter()
                .map(|item| self.expand_item(item, options, namespace, session)),
        )
        .await
    }

    async fn expand_item(
        &self,
        item: FeedItem,
        options: &ExtractOptions,
        namespace: &str,
        session: Option<&BrowserSession>,
    ) -> FeedItem {
        match self.try_expand(&item, options, namespace, session).await {
            Ok(Some(expanded)) => expanded,
            Ok(None) => item,
            Err(e) => {
                tracing::debug!(
                    "Content expansion failed for {}: {}",
                    item.link.as_deref().unwrap_or("<no link>"),
                    e
                );
                item
            }
        }
    }

    /// `Ok(None)` means expansion did not apply to this item; errors mean
    /// expansion was attempted and failed, and are caught one level up.
    async fn try_expand(
        &self,
        item: &FeedItem,
        options: &ExtractOptions,
        namespace: &str,
        session: Option<&BrowserSession>,
    ) -> Result<Option<FeedItem>> {
        let Some(link) = item.link.as_deref() else {
            return Ok(None);
        };
        let Some(article_selector) = options.content.as_deref() else {
            return Ok(None);
        };

        let key = format!("{}:{}", namespace, link);
        if let Some(stored) = self.cache.get(&key).await? {
            match serde_json::from_str(&stored) {
                Ok(cached) => return Ok(Some(cached)),
                Err(e) => {
                    tracing::debug!("Discarding corrupt cache entry for {}: {}", link, e);
                }
            }
        }

        let body = match session {
            Some(session) => session.goto_and_fetch(link, Some(article_selector)).await?,
            None => self.fetcher.fetch(link).await?,
        };
        if body.trim().is_empty() {
            return Err(TributaryError::FeedParse(format!(
                "Empty response from {}",
                link
            )));
        }

        let article = extract_article(&body, link, options).ok_or_else(|| {
            TributaryError::FeedParse(format!(
                "No content matched {:?} at {}",
                article_selector, link
            ))
        })?;

        let expanded = expanded_item(item, article);
        self.cache
            .set(&key, &serde_json::to_string(&expanded)?)
            .await?;
        Ok(Some(expanded))
    }
}

fn expanded_item(item: &FeedItem, article: Article) -> FeedItem {
    let mut expanded = item.clone();
    expanded.description = Some(article.html.clone());
    expanded.attachments = article.attachments;
    expanded.content = Some(ContentBody {
        html: collapse_whitespace(&article.html),
        text: article.text,
    });
    expanded
}

struct Article {
    html: String,
    text: String,
    attachments: Vec<Attachment>,
}

/// Pull the article fragment out of a fetched page.
///
/// Content-stage selectors degrade instead of failing: an unparseable
/// exclude/include/text/media selector is simply skipped, and `None` is
/// only returned when no article root matches at all.
fn extract_article(body: &str, item_link: &str, options: &ExtractOptions) -> Option<Article> {
    let article_selector = Selector::parse(options.content.as_deref()?).ok()?;

    let mut document = Html::parse_document(body);

    if let Some(exclude) = options.exclude.as_deref() {
        if let Ok(selector) = Selector::parse(exclude) {
            sanitize::remove_matching(&mut document, &selector);
        }
    }
    if let Some(include) = options.include.as_deref() {
        if let Ok(selector) = Selector::parse(include) {
            sanitize::prune_to_include(&mut document, &selector);
        }
    }

    let root = document.select(&article_selector).next()?;
    let html = sanitize::sanitize_element(root);

    // Text selectors are scoped to the article; only the media scan below
    // looks at the whole document.
    let text = options
        .content_text
        .as_deref()
        .and_then(|raw| Selector::parse(raw).ok())
        .map(|selector| {
            root.select(&selector)
                .map(|m| m.text().collect::<String>())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .map(|text| collapse_whitespace(&text))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| collapse_whitespace(&sanitize::text_content(root)));

    let attachments = options
        .media
        .as_deref()
        .and_then(|raw| Selector::parse(raw).ok())
        .map(|selector| collect_attachments(&document, &selector, item_link))
        .unwrap_or_default();

    Some(Article {
        html,
        text,
        attachments,
    })
}

fn collect_attachments(document: &Html, selector: &Selector, base: &str) -> Vec<Attachment> {
    let Ok(base) = Url::parse(base) else {
        return Vec::new();
    };

    document
        .select(selector)
        .filter_map(|element| {
            let raw = MEDIA_URL_ATTRIBUTES
                .iter()
                .find_map(|name| element.value().attr(name))?;

            // srcset values list candidates with width descriptors; take
            // the first URL.
            let candidate = raw.split(',').next()?.split_whitespace().next()?;
            let url = base.join(candidate).ok()?;

            Some(Attachment {
                url: url.to_string(),
                mime_type: element.value().attr("type").map(String::from),
                title: element
                    .value()
                    .attr("alt")
                    .or_else(|| element.value().attr("title"))
                    .map(String::from),
                size_in_bytes: element.value().attr("size").and_then(|v| v.parse().ok()),
                duration_in_seconds: element
                    .value()
                    .attr("duration")
                    .and_then(|v| v.parse().ok()),
            })
        })
        .collect()
}
