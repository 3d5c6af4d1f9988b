use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::FeedItem;

/// A normalized feed: header fields plus the extracted items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feed {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Always the source URL the feed was extracted from.
    pub link: String,
    /// Non-item channel children that have no typed field, keyed by tag name.
    pub extras: BTreeMap<String, String>,
    pub items: Vec<FeedItem>,
}

impl Feed {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Default::default()
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.link)
    }
}
