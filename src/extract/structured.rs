use std::collections::BTreeMap;

use crate::app::{Result, TributaryError};
use crate::datetime::DateNormalizer;
use crate::domain::{ExtractOptions, Feed, FeedItem};
use crate::extract::fields::{self, FieldKind};
use crate::extract::xml::{parse_document, XmlElement};
use crate::fetch::DocumentFetcher;
use crate::util::unwrap_pre_encoded;

/// Extract a feed from an RSS 2.0 or Atom document at `url`.
pub async fn extract(
    url: &str,
    options: &ExtractOptions,
    fetcher: &DocumentFetcher,
) -> Result<Feed> {
    let body = fetcher.fetch_document(url, None).await?;
    if body.trim().is_empty() {
        return Err(TributaryError::FeedParse(format!(
            "Empty response from {}",
            url
        )));
    }

    // Feeds served through HTML viewers arrive entity-encoded inside <pre>.
    let body = unwrap_pre_encoded(&body).unwrap_or(body);

    build_feed(url, &body, options)
}

fn build_feed(url: &str, body: &str, options: &ExtractOptions) -> Result<Feed> {
    let root = parse_document(body)
        .ok_or_else(|| TributaryError::FeedParse(format!("No XML root element in {}", url)))?;

    if root.name != "rss" && root.name != "feed" {
        return Err(TributaryError::FeedParse(format!(
            "Not an RSS or Atom document: <{}>",
            root.name
        )));
    }

    // RSS nests everything in <channel>; Atom hangs entries off the root.
    let container = root
        .children
        .iter()
        .find(|child| child.name == "channel")
        .unwrap_or(&root);

    let map = fields::tag_map(&options.rules);
    let mut dates = DateNormalizer::new(options.timezone_offset, options.locale.as_deref());
    let mut feed = Feed::new(url);

    // Header fields come off the container, but items count wherever they
    // sit in the document, not only as container children.
    for child in &container.children {
        if child.name != "item" && child.name != "entry" {
            apply_header(&mut feed, child);
        }
    }

    let mut item_elements = Vec::new();
    collect_items(&root, &mut item_elements);

    for element in item_elements {
        // Once the cap is reached remaining items are skipped outright,
        // not mapped and discarded.
        if feed.items.len() >= options.max_items {
            break;
        }
        let item = map_item(element, &map, url, &mut dates);
        if !fields::matches_category_filter(&item, &options.filter_category) {
            continue;
        }
        feed.items.push(item);
    }

    Ok(feed)
}

/// Collect `item`/`entry` elements at any depth, in document order.
fn collect_items<'a>(element: &'a XmlElement, found: &mut Vec<&'a XmlElement>) {
    for child in &element.children {
        if child.name == "item" || child.name == "entry" {
            found.push(child);
        } else {
            collect_items(child, found);
        }
    }
}

fn map_item(
    element: &XmlElement,
    map: &BTreeMap<String, FieldKind>,
    base_url: &str,
    dates: &mut DateNormalizer,
) -> FeedItem {
    let mut item = FeedItem::new();
    for child in &element.children {
        let kind = fields::classify(&child.name, map);
        fields::apply_structured(&mut item, &kind, child, base_url, dates);
    }
    item
}

fn apply_header(feed: &mut Feed, element: &XmlElement) {
    // The feed link always stays the source URL; a header <link> is not
    // copied over it.
    if element.name == "link" {
        return;
    }

    let text = element.deep_text();
    if text.is_empty() {
        return;
    }

    match element.name.as_str() {
        "title" => {
            if feed.title.is_none() {
                feed.title = Some(text);
            }
        }
        "description" => {
            if feed.description.is_none() {
                feed.description = Some(text);
            }
        }
        _ => {
            feed.extras.entry(element.name.clone()).or_insert(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::domain::FieldRule;
    use crate::fetch::Fetcher;

    struct StaticFetcher(String);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn fetcher_for(body: &str) -> DocumentFetcher {
        DocumentFetcher::new(Arc::new(StaticFetcher(body.to_string())), None)
    }

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <description>Example description</description>
    <link>http://example.com/</link>
    <language>en</language>
    <item>
      <title>A</title>
      <link>http://x/1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <entry>
    <title>Entry One</title>
    <link href="http://example.com/one"/>
  </entry>
  <entry>
    <title>Entry Two</title>
    <link href="/two"/>
  </entry>
</feed>"#;

    #[tokio::test]
    async fn test_minimal_rss_feed() {
        let feed = extract(
            "http://example.com/feed",
            &ExtractOptions::default(),
            &fetcher_for(RSS_SAMPLE),
        )
        .await
        .unwrap();

        assert_eq!(feed.title.as_deref(), Some("Example Feed"));
        assert_eq!(feed.description.as_deref(), Some("Example description"));
        // The feed link is the source URL, not the channel's <link>.
        assert_eq!(feed.link, "http://example.com/feed");
        assert_eq!(feed.extras.get("language").map(String::as_str), Some("en"));

        assert_eq!(feed.items.len(), 1);
        let item = &feed.items[0];
        assert_eq!(item.title.as_deref(), Some("A"));
        assert_eq!(item.link.as_deref(), Some("http://x/1"));
        assert_eq!(
            item.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_atom_entries() {
        let feed = extract(
            "http://example.com/atom",
            &ExtractOptions::default(),
            &fetcher_for(ATOM_SAMPLE),
        )
        .await
        .unwrap();

        assert_eq!(feed.title.as_deref(), Some("Atom Feed"));
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].link.as_deref(), Some("http://example.com/one"));
        // Relative hrefs resolve against the source URL.
        assert_eq!(feed.items[1].link.as_deref(), Some("http://example.com/two"));
    }

    #[tokio::test]
    async fn test_items_outside_the_container_are_collected() {
        let body = r#"<rss>
          <channel>
            <title>T</title>
            <item><title>In</title></item>
          </channel>
          <item><title>Out</title></item>
        </rss>"#;

        let feed = extract(
            "http://example.com/feed",
            &ExtractOptions::default(),
            &fetcher_for(body),
        )
        .await
        .unwrap();

        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title.as_deref(), Some("In"));
        assert_eq!(feed.items[1].title.as_deref(), Some("Out"));
    }

    #[tokio::test]
    async fn test_nested_items_are_collected() {
        let body = r#"<rss><channel>
          <wrapper><item><title>Deep</title></item></wrapper>
        </channel></rss>"#;

        let feed = extract(
            "http://example.com/feed",
            &ExtractOptions::default(),
            &fetcher_for(body),
        )
        .await
        .unwrap();

        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title.as_deref(), Some("Deep"));
        // The wrapper is still a container child, so its text doubles as a
        // header field.
        assert_eq!(feed.extras.get("wrapper").map(String::as_str), Some("Deep"));
    }

    #[tokio::test]
    async fn test_content_encoded_maps_to_description() {
        let body = r#"<rss><channel><item>
            <title>A</title>
            <content:encoded><![CDATA[<p>Full body</p>]]></content:encoded>
        </item></channel></rss>"#;

        let feed = extract(
            "http://example.com/feed",
            &ExtractOptions::default(),
            &fetcher_for(body),
        )
        .await
        .unwrap();

        assert_eq!(feed.items[0].description.as_deref(), Some("<p>Full body</p>"));
    }

    #[tokio::test]
    async fn test_rules_remap_tags() {
        let body = r#"<feed>
          <entry>
            <title>E</title>
            <updated>2024-01-02T03:04:05Z</updated>
          </entry>
        </feed>"#;

        let mut options = ExtractOptions::default();
        options.rules.pub_date = Some(FieldRule::from("updated"));

        let feed = extract("http://example.com/atom", &options, &fetcher_for(body))
            .await
            .unwrap();

        assert_eq!(
            feed.items[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[tokio::test]
    async fn test_category_filter_drops_items() {
        let body = r#"<rss><channel>
          <item><title>1</title><category>Tech</category></item>
          <item><title>2</title><category>News</category></item>
          <item><title>3</title><category>Other</category></item>
        </channel></rss>"#;

        let mut options = ExtractOptions::default();
        options.filter_category = vec!["tech".to_string(), "news".to_string()];

        let feed = extract("http://example.com/feed", &options, &fetcher_for(body))
            .await
            .unwrap();

        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title.as_deref(), Some("1"));
        assert_eq!(feed.items[1].title.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_max_items_caps_processing() {
        let body = r#"<rss><channel>
          <item><title>1</title></item>
          <item><title>2</title></item>
          <item><title>3</title></item>
          <item><title>4</title></item>
        </channel></rss>"#;

        let mut options = ExtractOptions::default();
        options.max_items = 2;

        let feed = extract("http://example.com/feed", &options, &fetcher_for(body))
            .await
            .unwrap();

        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[1].title.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_filtered_items_do_not_consume_the_cap() {
        let body = r#"<rss><channel>
          <item><title>1</title><category>Skip</category></item>
          <item><title>2</title><category>Keep</category></item>
          <item><title>3</title><category>Keep</category></item>
        </channel></rss>"#;

        let mut options = ExtractOptions::default();
        options.max_items = 2;
        options.filter_category = vec!["keep".to_string()];

        let feed = extract("http://example.com/feed", &options, &fetcher_for(body))
            .await
            .unwrap();

        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_pre_wrapped_feed_is_unwrapped() {
        let body = "<html><body><pre>&lt;rss&gt;&lt;channel&gt;&lt;title&gt;Wrapped&lt;/title&gt;\
                    &lt;item&gt;&lt;title&gt;W1&lt;/title&gt;&lt;/item&gt;\
                    &lt;/channel&gt;&lt;/rss&gt;</pre></body></html>";

        let feed = extract(
            "http://example.com/feed",
            &ExtractOptions::default(),
            &fetcher_for(body),
        )
        .await
        .unwrap();

        assert_eq!(feed.title.as_deref(), Some("Wrapped"));
        assert_eq!(feed.items[0].title.as_deref(), Some("W1"));
    }

    #[tokio::test]
    async fn test_non_feed_document_is_an_error() {
        let err = extract(
            "http://example.com/page",
            &ExtractOptions::default(),
            &fetcher_for("<html><body>nope</body></html>"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TributaryError::FeedParse(_)));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let err = extract(
            "http://example.com/feed",
            &ExtractOptions::default(),
            &fetcher_for("   "),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TributaryError::FeedParse(_)));
    }
}
