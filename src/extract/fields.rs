use std::collections::BTreeMap;

use crate::datetime::DateNormalizer;
use crate::domain::{FeedItem, MediaEntry, RuleSet};
use crate::extract::xml::XmlElement;
use crate::util::resolve_link;

/// Target slot for one mapped tag or rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Link,
    Description,
    PubDate,
    Author,
    Category,
    Guid,
    Enclosure,
    /// `media:*` tags, keyed by the part after the prefix.
    Media(String),
    /// Anything unrecognized is kept under its tag name.
    Extra(String),
}

/// Default tag-to-field aliases for structured feeds.
const DEFAULT_TAG_ALIASES: [(&str, FieldKind); 3] = [
    ("content:encoded", FieldKind::Description),
    ("dc:content", FieldKind::Description),
    ("dc:creator", FieldKind::Author),
];

fn kind_for_name(name: &str) -> Option<FieldKind> {
    match name {
        "title" => Some(FieldKind::Title),
        "link" => Some(FieldKind::Link),
        "description" => Some(FieldKind::Description),
        "pubDate" | "pub_date" => Some(FieldKind::PubDate),
        "author" => Some(FieldKind::Author),
        "category" => Some(FieldKind::Category),
        "guid" => Some(FieldKind::Guid),
        "enclosure" => Some(FieldKind::Enclosure),
        _ => None,
    }
}

/// Build the tag alias table for structured extraction: the defaults plus
/// the caller's rules, whose selector strings name tags here and override
/// defaults on collision.
pub fn tag_map(rules: &RuleSet) -> BTreeMap<String, FieldKind> {
    let mut map: BTreeMap<String, FieldKind> = DEFAULT_TAG_ALIASES
        .iter()
        .map(|(tag, kind)| (tag.to_string(), kind.clone()))
        .collect();

    for (field, rule) in rules.entries() {
        if let Some(kind) = kind_for_name(field) {
            map.insert(rule.selector().to_string(), kind);
        }
    }

    map
}

/// Decide which field a tag feeds.
pub fn classify(tag: &str, map: &BTreeMap<String, FieldKind>) -> FieldKind {
    if let Some(kind) = map.get(tag) {
        return kind.clone();
    }
    if let Some(kind) = kind_for_name(tag) {
        return kind;
    }
    if let Some(rest) = tag.strip_prefix("media:") {
        return FieldKind::Media(rest.to_string());
    }
    FieldKind::Extra(tag.to_string())
}

/// Copy one element's value into the item slot `kind` names.
///
/// Scalar fields are first-occurrence-wins; categories accumulate and
/// `media:*` entries collect under suffixed keys. Dates only reach the
/// normalizer while the item has no timestamp yet, so later date-like tags
/// cannot disturb its ordering state.
pub fn apply_structured(
    item: &mut FeedItem,
    kind: &FieldKind,
    element: &XmlElement,
    base_url: &str,
    dates: &mut DateNormalizer,
) {
    let text = element.deep_text();

    match kind {
        FieldKind::Title => {
            if item.title.is_none() && !text.is_empty() {
                item.title = Some(text);
            }
        }
        FieldKind::Description => {
            if item.description.is_none() && !text.is_empty() {
                item.description = Some(text);
            }
        }
        FieldKind::Author => {
            if item.author.is_none() && !text.is_empty() {
                item.author = Some(text);
            }
        }
        FieldKind::Guid => {
            if item.guid.is_none() && !text.is_empty() {
                item.guid = Some(text);
            }
        }
        FieldKind::Link => {
            if item.link.is_none() {
                // RSS carries the link as text, Atom as an href attribute.
                let raw = if text.is_empty() {
                    element.attr("href").unwrap_or("")
                } else {
                    text.as_str()
                };
                if let Some(resolved) = resolve_link(raw, base_url) {
                    item.link = Some(resolved);
                }
            }
        }
        FieldKind::PubDate => {
            if item.published_at.is_none() {
                item.published_at = dates.parse(&text);
            }
        }
        FieldKind::Category => {
            item.push_category(&text);
        }
        FieldKind::Enclosure => {
            if item.enclosure_url.is_none() {
                if let Some(url) = element.attr("url") {
                    item.enclosure_url = Some(url.to_string());
                    item.enclosure_type = element.attr("type").map(String::from);
                    item.enclosure_length = element.attr("length").and_then(|l| l.parse().ok());
                    item.enclosure_title = element.attr("description").map(String::from);
                }
            }
        }
        FieldKind::Media(key) => {
            let entry = MediaEntry {
                attributes: element.attributes.iter().cloned().collect(),
                text: (!text.is_empty()).then(|| text.clone()),
            };
            item.push_media(key, entry);
        }
        FieldKind::Extra(name) => {
            if !item.extras.contains_key(name) && !text.is_empty() {
                item.extras.insert(name.clone(), text);
            }
        }
    }
}

/// Case-insensitive allow-list check. An empty filter admits everything.
pub fn matches_category_filter(item: &FeedItem, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }

    item.categories.iter().any(|category| {
        let category = category.trim().to_lowercase();
        filter
            .iter()
            .any(|allowed| allowed.trim().to_lowercase() == category)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldRule;

    fn element(name: &str, text: &str) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn apply(item: &mut FeedItem, el: &XmlElement, map: &BTreeMap<String, FieldKind>) {
        let mut dates = DateNormalizer::new(None, None);
        let kind = classify(&el.name, map);
        apply_structured(item, &kind, el, "http://example.com/feed", &mut dates);
    }

    #[test]
    fn test_default_aliases() {
        let map = tag_map(&RuleSet::default());
        assert_eq!(
            classify("content:encoded", &map),
            FieldKind::Description
        );
        assert_eq!(classify("dc:content", &map), FieldKind::Description);
        assert_eq!(classify("dc:creator", &map), FieldKind::Author);
        assert_eq!(classify("title", &map), FieldKind::Title);
        assert_eq!(classify("pubDate", &map), FieldKind::PubDate);
    }

    #[test]
    fn test_rules_override_aliases() {
        let mut rules = RuleSet::default();
        rules.description = Some(FieldRule::from("summary"));
        rules.pub_date = Some(FieldRule::from("published"));

        let map = tag_map(&rules);
        assert_eq!(classify("summary", &map), FieldKind::Description);
        assert_eq!(classify("published", &map), FieldKind::PubDate);
        // Defaults not named by a rule survive.
        assert_eq!(classify("dc:creator", &map), FieldKind::Author);
    }

    #[test]
    fn test_unknown_tags_classify_as_extra_or_media() {
        let map = tag_map(&RuleSet::default());
        assert_eq!(
            classify("media:thumbnail", &map),
            FieldKind::Media("thumbnail".to_string())
        );
        assert_eq!(
            classify("slash:comments", &map),
            FieldKind::Extra("slash:comments".to_string())
        );
    }

    #[test]
    fn test_scalar_fields_first_occurrence_wins() {
        let map = tag_map(&RuleSet::default());
        let mut item = FeedItem::new();

        apply(&mut item, &element("title", "First"), &map);
        apply(&mut item, &element("title", "Second"), &map);
        assert_eq!(item.title.as_deref(), Some("First"));

        // Empty text does not claim the slot either.
        let mut item = FeedItem::new();
        apply(&mut item, &element("title", ""), &map);
        apply(&mut item, &element("title", "Late"), &map);
        assert_eq!(item.title.as_deref(), Some("Late"));
    }

    #[test]
    fn test_categories_accumulate() {
        let map = tag_map(&RuleSet::default());
        let mut item = FeedItem::new();

        apply(&mut item, &element("category", "Tech"), &map);
        apply(&mut item, &element("category", "News"), &map);
        apply(&mut item, &element("category", "Tech"), &map);
        assert_eq!(item.categories, vec!["Tech", "News"]);
    }

    #[test]
    fn test_link_from_text_and_from_href() {
        let map = tag_map(&RuleSet::default());

        let mut item = FeedItem::new();
        apply(&mut item, &element("link", "http://example.com/post"), &map);
        assert_eq!(item.link.as_deref(), Some("http://example.com/post"));

        let mut item = FeedItem::new();
        let mut atom_link = element("link", "");
        atom_link
            .attributes
            .push(("href".to_string(), "/entry/1".to_string()));
        apply(&mut item, &atom_link, &map);
        assert_eq!(item.link.as_deref(), Some("http://example.com/entry/1"));
    }

    #[test]
    fn test_pub_date_is_parsed_once() {
        let map = tag_map(&RuleSet::default());
        let mut item = FeedItem::new();
        let mut dates = DateNormalizer::new(None, None);

        let first = element("pubDate", "Mon, 01 Jan 2024 00:00:00 GMT");
        let kind = classify(&first.name, &map);
        apply_structured(&mut item, &kind, &first, "http://example.com", &mut dates);

        let second = element("pubDate", "Tue, 02 Jan 2024 00:00:00 GMT");
        let kind = classify(&second.name, &map);
        apply_structured(&mut item, &kind, &second, "http://example.com", &mut dates);

        assert_eq!(
            item.published_at.map(|d| d.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_enclosure_attributes() {
        let map = tag_map(&RuleSet::default());
        let mut item = FeedItem::new();

        let mut enclosure = element("enclosure", "");
        enclosure.attributes.extend([
            ("url".to_string(), "http://example.com/ep.mp3".to_string()),
            ("type".to_string(), "audio/mpeg".to_string()),
            ("length".to_string(), "123456".to_string()),
            ("description".to_string(), "Episode 1".to_string()),
        ]);
        apply(&mut item, &enclosure, &map);

        assert_eq!(item.enclosure_url.as_deref(), Some("http://example.com/ep.mp3"));
        assert_eq!(item.enclosure_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(item.enclosure_length, Some(123456));
        assert_eq!(item.enclosure_title.as_deref(), Some("Episode 1"));

        // A urlless enclosure would not have claimed the slot.
        let mut bare = FeedItem::new();
        apply(&mut bare, &element("enclosure", ""), &map);
        assert_eq!(bare.enclosure_url, None);
    }

    #[test]
    fn test_media_entries_collect_with_suffixes() {
        let map = tag_map(&RuleSet::default());
        let mut item = FeedItem::new();

        let mut thumb = element("media:thumbnail", "");
        thumb
            .attributes
            .push(("url".to_string(), "http://example.com/a.jpg".to_string()));
        apply(&mut item, &thumb, &map);

        let mut thumb2 = element("media:thumbnail", "");
        thumb2
            .attributes
            .push(("url".to_string(), "http://example.com/b.jpg".to_string()));
        apply(&mut item, &thumb2, &map);

        assert!(item.media.contains_key("thumbnail"));
        assert!(item.media.contains_key("thumbnail_1"));
    }

    #[test]
    fn test_category_filter() {
        let mut item = FeedItem::new();
        item.push_category("Tech");
        item.push_category("News");

        assert!(matches_category_filter(&item, &[]));
        assert!(matches_category_filter(&item, &["tech".to_string()]));
        assert!(matches_category_filter(
            &item,
            &["Sports".to_string(), " NEWS ".to_string()]
        ));
        assert!(!matches_category_filter(&item, &["Sports".to_string()]));

        let bare = FeedItem::new();
        assert!(!matches_category_filter(&bare, &["tech".to_string()]));
    }
}
