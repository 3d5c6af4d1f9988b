use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized feed entry.
///
/// Every field is optional except the accumulating collections; extraction
/// fills in whatever the source document provides. Items round-trip through
/// the cache as JSON, so unknown or missing fields deserialize to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    pub title: Option<String>,
    /// Absolute URL, or absent. Relative values are resolved against the
    /// source document URL at extraction time.
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<ContentBody>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub guid: Option<String>,
    /// Ordered, de-duplicated.
    pub categories: Vec<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<i64>,
    pub enclosure_title: Option<String>,
    /// `media:*` elements keyed by suffix-deduplicated name.
    pub media: BTreeMap<String, MediaEntry>,
    pub attachments: Vec<Attachment>,
    /// Unrecognized item children, keyed by tag name. Keeps vendor
    /// extensions (iTunes tags and the like) addressable downstream.
    pub extras: BTreeMap<String, String>,
}

/// Expanded article content in both shapes consumers want.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBody {
    pub html: String,
    pub text: String,
}

/// One `media:*` element: its attributes plus any text payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaEntry {
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
}

/// A media resource discovered during content expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub url: String,
    pub mime_type: Option<String>,
    pub title: Option<String>,
    pub size_in_bytes: Option<i64>,
    pub duration_in_seconds: Option<i64>,
}

impl FeedItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }

    /// Append a category, preserving order and skipping duplicates and
    /// empty values.
    pub fn push_category(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if !self.categories.iter().any(|c| c == value) {
            self.categories.push(value.to_string());
        }
    }

    /// Insert a `media:*` entry, suffixing the key when it collides with an
    /// already stored one (`thumbnail`, `thumbnail_1`, `thumbnail_2`, ...).
    pub fn push_media(&mut self, key: &str, entry: MediaEntry) {
        let existing = self.media.keys().filter(|k| k.starts_with(key)).count();
        let final_key = if existing > 0 {
            format!("{}_{}", key, existing)
        } else {
            key.to_string()
        };
        self.media.insert(final_key, entry);
    }
}
