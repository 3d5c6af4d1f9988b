//! Key-value caching for fetched and extracted content.
//!
//! Extraction results are memoized under deterministic keys so that
//! repeated requests for the same URL with the same rules replay from the
//! cache instead of refetching. Failed computations are never stored, which
//! keeps transient fetch errors from sticking.

pub mod memory;
pub mod sqlite;

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::app::Result;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

#[async_trait]
pub trait Cache {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Return the cached value for `key`, computing and storing it on a miss.
///
/// The computation runs at most once per absent key when callers do not
/// race on it. Errors from the computation propagate and leave the cache
/// unwritten, so the next call retries instead of replaying a failure.
pub async fn try_get<F, Fut>(
    cache: &(dyn Cache + Send + Sync),
    key: &str,
    compute: F,
) -> Result<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if let Some(existing) = cache.get(key).await? {
        return Ok(existing);
    }

    let value = compute().await?;
    cache.set(key, &value).await?;
    Ok(value)
}

/// Derive a deterministic cache key from an operation namespace, a source
/// URL, and the parameters that shaped the result. The parameters are
/// hashed so rule changes invalidate old entries.
pub fn content_key<T: Serialize>(namespace: &str, url: &str, params: &T) -> Result<String> {
    let serialized = serde_json::to_string(params)?;
    let digest = hex::encode(Sha256::digest(serialized.as_bytes()));
    Ok(format!("{}:{}:{}", namespace, url, &digest[..16]))
}
