pub mod feed;
pub mod item;
pub mod rules;

pub use feed::Feed;
pub use item::{Attachment, ContentBody, FeedItem, MediaEntry};
pub use rules::{ExtractOptions, FieldRule, RuleSet};
