//! Shared wiring for the core components.

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::{Result, TributaryError};
use crate::cache::{Cache, MemoryCache, SqliteCache};
use crate::config::CoreConfig;
use crate::extract::Extractor;
use crate::fetch::{Fetcher, HttpFetcher};

/// Holds the long-lived pieces every extraction shares: the cache, the HTTP
/// client, and the loaded configuration. Build one at startup and hand out
/// [`Extractor`]s from it.
pub struct AppContext {
    pub cache: Arc<dyn Cache + Send + Sync>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub config: CoreConfig,
}

impl AppContext {
    /// Build a context backed by the on-disk SQLite cache.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let path = match config.cache.path.clone() {
            Some(path) => path,
            None => default_cache_path()?,
        };
        let cache = SqliteCache::new(path)?;

        Ok(Self {
            cache: Arc::new(cache),
            fetcher: Arc::new(HttpFetcher::with_config(config.fetch.clone())),
            config,
        })
    }

    /// Build a context whose cache lives in memory. Nothing touches the
    /// filesystem; meant for tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self {
            cache: Arc::new(MemoryCache::new()),
            fetcher: Arc::new(HttpFetcher::new()),
            config: CoreConfig::default(),
        }
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(
            self.cache.clone(),
            self.fetcher.clone(),
            self.config.session.clone(),
        )
    }
}

fn default_cache_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| TributaryError::Config("Could not determine data directory".to_string()))?
        .join("tributary");
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("cache.db"))
}
