use serde::{Deserialize, Serialize};

/// How to locate one field's value.
///
/// Deserializes from either a bare selector string or an object carrying the
/// selector plus an attribute name to read off the matched element. In
/// structured (RSS/Atom) mode the selector is interpreted as a tag name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRule {
    Selector(String),
    WithAttribute {
        #[serde(alias = "element")]
        selector: String,
        #[serde(alias = "attr")]
        attribute: Option<String>,
    },
}

impl FieldRule {
    pub fn selector(&self) -> &str {
        match self {
            FieldRule::Selector(selector) => selector,
            FieldRule::WithAttribute { selector, .. } => selector,
        }
    }

    pub fn attribute(&self) -> Option<&str> {
        match self {
            FieldRule::Selector(_) => None,
            FieldRule::WithAttribute { attribute, .. } => attribute.as_deref(),
        }
    }
}

impl From<&str> for FieldRule {
    fn from(selector: &str) -> Self {
        FieldRule::Selector(selector.to_string())
    }
}

/// Per-field extraction rules. Unset fields fall back to format-specific
/// defaults: tag names in structured mode, `a@href` / `img@src` style
/// selectors in generic mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleSet {
    pub title: Option<FieldRule>,
    pub description: Option<FieldRule>,
    pub pub_date: Option<FieldRule>,
    pub author: Option<FieldRule>,
    pub category: Option<FieldRule>,
    pub guid: Option<FieldRule>,
    pub link: Option<FieldRule>,
    pub enclosure: Option<FieldRule>,
}

impl RuleSet {
    /// The configured rules as (field name, rule) pairs, in declaration
    /// order. Field names use the struct's Rust spelling.
    pub fn entries(&self) -> Vec<(&'static str, &FieldRule)> {
        [
            ("title", self.title.as_ref()),
            ("description", self.description.as_ref()),
            ("pub_date", self.pub_date.as_ref()),
            ("author", self.author.as_ref()),
            ("category", self.category.as_ref()),
            ("guid", self.guid.as_ref()),
            ("link", self.link.as_ref()),
            ("enclosure", self.enclosure.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, rule)| rule.map(|r| (name, r)))
        .collect()
    }
}

/// Everything a caller can tune about one extraction request.
///
/// Requests serialize these options into the content cache key, so the
/// derivation stays deterministic for identical requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractOptions {
    pub rules: RuleSet,

    /// Generic mode: selector matching each item element. Required there,
    /// ignored in structured mode.
    pub item: Option<String>,

    /// Generic mode: overrides the feed-title lookup (defaults to the
    /// document `<title>`, then the source URL).
    pub feed_title: Option<FieldRule>,

    /// Article root selector. Setting it enables full-content expansion.
    pub content: Option<String>,

    /// Elements to remove from fetched article documents.
    pub exclude: Option<String>,

    /// When set, article documents are pruned to the subtrees on the path
    /// to this selector's matches before the article root is located.
    pub include: Option<String>,

    /// Selector whose matches supply the article plain text. Without it the
    /// text is derived from the sanitized fragment.
    pub content_text: Option<String>,

    /// Selector for attachment-bearing media elements.
    pub media: Option<String>,

    /// Render documents in a pooled browser tab instead of plain HTTP.
    pub use_browser: bool,

    /// Stop mapping item elements once this many items survived filtering.
    pub max_items: usize,

    /// Case-insensitive category allow-list; empty means no filtering.
    pub filter_category: Vec<String>,

    /// Hour offset (fractional allowed) applied to dates that carry no
    /// explicit timezone.
    pub timezone_offset: Option<f64>,

    /// Locale hint for month names in non-English dates.
    pub locale: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            item: None,
            feed_title: None,
            content: None,
            exclude: None,
            include: None,
            content_text: None,
            media: None,
            use_browser: false,
            max_items: 20,
            filter_category: Vec::new(),
            timezone_offset: None,
            locale: None,
        }
    }
}
