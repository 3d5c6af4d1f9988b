//! # Tributary
//!
//! A feed extraction engine that turns RSS/Atom documents and plain HTML
//! listing pages into one normalized feed model.
//!
//! ## Architecture
//!
//! Tributary follows a modular pipeline architecture:
//!
//! ```text
//! FeedRequest → Extractor → Feed
//!                   │
//!        ┌──────────┴───────────┐
//!   structured               generic
//!   (RSS/Atom)            (CSS rules)
//!        └──────────┬───────────┘
//!            DocumentFetcher
//!         (HTTP | browser tabs)
//!                   │
//!            ContentExpander
//!             (cache-backed)
//! ```
//!
//! - [`extract`]: The two extraction engines and the [`Extractor`](extract::Extractor) facade
//! - [`session`]: Shared headless browser with a bounded, reusable tab pool
//! - [`content`]: Per-item full-content expansion with sanitization
//! - [`cache`]: Memoization layer (in-memory or SQLite)
//! - [`datetime`]: Tolerant, locale-aware date normalization
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tributary::app::AppContext;
//! use tributary::config::CoreConfig;
//! use tributary::extract::{FeedRequest, SourceKind};
//!
//! let context = AppContext::new(CoreConfig::load()?)?;
//! let feed = context
//!     .extractor()
//!     .run(&FeedRequest {
//!         url: "https://example.com/feed.xml".into(),
//!         kind: SourceKind::Structured,
//!         options: Default::default(),
//!     })
//!     .await?;
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// cache, fetcher, configuration.
pub mod app;

/// Content memoization.
///
/// - [`Cache`](cache::Cache): Async get/set trait plus the
///   [`try_get`](cache::try_get) compute-and-store helper
/// - [`SqliteCache`](cache::SqliteCache): Durable SQLite implementation
/// - [`MemoryCache`](cache::MemoryCache): In-process implementation
pub mod cache;

/// Configuration management.
///
/// Loads from `~/.config/tributary/config.toml`, covering the browser
/// session, HTTP fetching, and cache placement.
pub mod config;

/// Full-content expansion for feed items.
///
/// Fetches each item's linked page, extracts and sanitizes the article
/// fragment, collects media attachments, and memoizes the result.
pub mod content;

/// Tolerant date parsing.
///
/// [`DateNormalizer`](datetime::DateNormalizer) handles RFC 2822/3339
/// dates strictly and falls back to fuzzy, locale-aware parsing with a
/// configured timezone offset.
pub mod datetime;

/// Core domain models.
///
/// - [`Feed`](domain::Feed) and [`FeedItem`](domain::FeedItem): The
///   normalized output shape
/// - [`ExtractOptions`](domain::ExtractOptions) and
///   [`RuleSet`](domain::RuleSet): Per-source extraction settings
pub mod domain;

/// Feed extraction engines.
///
/// - [`structured`](extract::structured): RSS 2.0 / Atom documents
/// - [`generic`](extract::generic): HTML listing pages driven by CSS rules
/// - [`Extractor`](extract::Extractor): Routing, browser lifecycle, and
///   content expansion around both
pub mod extract;

/// Plain HTTP fetching.
///
/// - [`Fetcher`](fetch::Fetcher): Async trait for document fetching
/// - [`HttpFetcher`](fetch::HttpFetcher): reqwest-based implementation
/// - [`DocumentFetcher`](fetch::DocumentFetcher): Routes between HTTP and
///   the browser session
pub mod fetch;

/// Shared headless browser session.
///
/// One Chromium instance with a bounded pool of reusable tabs; navigation
/// counting and host-change detection decide when a tab gets reset.
pub mod session;

/// Small string and URL helpers shared across the engines.
pub mod util;
