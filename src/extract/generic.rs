use scraper::{ElementRef, Html, Selector};

use crate::app::{Result, TributaryError};
use crate::datetime::DateNormalizer;
use crate::domain::{ExtractOptions, Feed, FeedItem, FieldRule};
use crate::extract::fields;
use crate::fetch::DocumentFetcher;
use crate::util::resolve_link;

/// Extract a feed from an arbitrary HTML page using CSS-selector rules.
///
/// Rule selectors are validated up front; a bad rule fails the request
/// before any network traffic.
pub async fn extract(
    url: &str,
    options: &ExtractOptions,
    fetcher: &DocumentFetcher,
) -> Result<Feed> {
    let rules = CompiledRules::compile(options)?;

    let body = fetcher
        .fetch_document(url, options.item.as_deref())
        .await?;
    if body.trim().is_empty() {
        return Err(TributaryError::FeedParse(format!(
            "Empty response from {}",
            url
        )));
    }

    let mut dates = DateNormalizer::new(options.timezone_offset, options.locale.as_deref());
    Ok(build_feed(url, &body, options, &rules, &mut dates))
}

#[derive(Debug)]
struct CompiledRule {
    selector: Selector,
    attribute: Option<String>,
}

#[derive(Debug)]
struct CompiledRules {
    item: Selector,
    doc_title: Selector,
    feed_title: Option<CompiledRule>,
    title: Option<CompiledRule>,
    description: Option<CompiledRule>,
    pub_date: Option<CompiledRule>,
    author: Option<CompiledRule>,
    category: Option<CompiledRule>,
    guid: Option<CompiledRule>,
    link: CompiledRule,
    enclosure: CompiledRule,
}

impl CompiledRules {
    fn compile(options: &ExtractOptions) -> Result<Self> {
        let item = options.item.as_deref().ok_or_else(|| {
            TributaryError::Selector("Generic extraction requires an item selector".to_string())
        })?;
        let rules = &options.rules;

        Ok(Self {
            item: compile_selector(item)?,
            doc_title: compile_selector("title")?,
            feed_title: compile_optional(options.feed_title.as_ref())?,
            title: compile_optional(rules.title.as_ref())?,
            description: compile_optional(rules.description.as_ref())?,
            pub_date: compile_optional(rules.pub_date.as_ref())?,
            author: compile_optional(rules.author.as_ref())?,
            category: compile_optional(rules.category.as_ref())?,
            guid: compile_optional(rules.guid.as_ref())?,
            link: match rules.link.as_ref() {
                Some(rule) => compile_rule(rule)?,
                None => CompiledRule {
                    selector: compile_selector("a")?,
                    attribute: Some("href".to_string()),
                },
            },
            enclosure: match rules.enclosure.as_ref() {
                Some(rule) => compile_rule(rule)?,
                None => CompiledRule {
                    selector: compile_selector("img")?,
                    attribute: Some("src".to_string()),
                },
            },
        })
    }
}

fn compile_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| TributaryError::Selector(format!("Invalid selector '{}': {}", raw, e)))
}

fn compile_rule(rule: &FieldRule) -> Result<CompiledRule> {
    Ok(CompiledRule {
        selector: compile_selector(rule.selector())?,
        attribute: rule.attribute().map(String::from),
    })
}

fn compile_optional(rule: Option<&FieldRule>) -> Result<Option<CompiledRule>> {
    rule.map(compile_rule).transpose()
}

fn build_feed(
    url: &str,
    body: &str,
    options: &ExtractOptions,
    rules: &CompiledRules,
    dates: &mut DateNormalizer,
) -> Feed {
    let document = Html::parse_document(body);
    let mut feed = Feed::new(url);

    feed.title = rules
        .feed_title
        .as_ref()
        .and_then(|rule| rule_value(document.root_element(), rule))
        .or_else(|| {
            document
                .select(&rules.doc_title)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| Some(url.to_string()));

    for element in document.select(&rules.item) {
        if feed.items.len() >= options.max_items {
            break;
        }

        let mut item = FeedItem::new();

        // Link first; it doubles as the target for content expansion.
        let raw_link = rule_value(element, &rules.link)
            .or_else(|| element.value().attr("href").map(String::from));
        item.link = raw_link.as_deref().and_then(|raw| resolve_link(raw, url));

        // Filter on category before anything stateful happens, so rejected
        // items cannot disturb the date normalizer.
        if let Some(rule) = rules.category.as_ref() {
            if let Some(value) = rule_value(element, rule) {
                item.push_category(&value);
            }
        }
        if !fields::matches_category_filter(&item, &options.filter_category) {
            continue;
        }

        item.title = rules
            .title
            .as_ref()
            .and_then(|rule| rule_value(element, rule))
            .or_else(|| element.value().attr("title").map(String::from));
        item.description = rules
            .description
            .as_ref()
            .and_then(|rule| rule_value(element, rule));
        if let Some(rule) = rules.pub_date.as_ref() {
            if let Some(value) = rule_value(element, rule) {
                item.published_at = dates.parse(&value);
            }
        }
        item.author = rules.author.as_ref().and_then(|r| rule_value(element, r));
        item.guid = rules.guid.as_ref().and_then(|r| rule_value(element, r));
        item.enclosure_url = rule_value(element, &rules.enclosure);

        feed.items.push(item);
    }

    feed
}

/// Evaluate one rule inside an item element.
///
/// Attribute rules read the first match, falling back to the item element's
/// own attribute when the value is missing or blank; text rules join every
/// match's trimmed text with spaces. Blank results are absent fields, never
/// empty strings.
fn rule_value(scope: ElementRef, rule: &CompiledRule) -> Option<String> {
    match rule.attribute.as_deref() {
        Some(attribute) => scope
            .select(&rule.selector)
            .next()
            .and_then(|m| m.value().attr(attribute))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| {
                scope
                    .value()
                    .attr(attribute)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            })
            .map(String::from),
        None => {
            let joined = scope
                .select(&rule.selector)
                .map(|m| m.text().collect::<String>())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
    }
}
