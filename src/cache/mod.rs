//! Full-result graph cache: normalized root name -> finished graph document.
//!
//! Entries never expire; the only invalidation is an explicit `evict`.
//! Read failures and corrupt entries behave as a miss.

pub mod file_store;
pub mod memory_store;
pub mod sqlite_store;

pub use file_store::FileGraphCache;
pub use memory_store::MemoryGraphCache;
pub use sqlite_store::SqliteGraphCache;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{CacheBackend, Config};
use crate::db::Db;
use crate::error::Result;
use crate::graph::GraphDocument;

/// Key -> document store checked before a crawl and written after it.
///
/// Operations on different keys must not interfere; concurrent puts on the
/// same key are last-writer-wins.
#[async_trait]
pub trait GraphCacheStore: Send + Sync {
    /// Cached document for `key`, or `None` on a miss or unreadable entry.
    async fn get(&self, key: &str) -> Option<GraphDocument>;

    /// Store `document` under `key`, replacing any previous entry.
    async fn put(&self, key: &str, document: &GraphDocument) -> Result<()>;

    /// Remove the entry for `key`. Returns whether an entry existed.
    async fn evict(&self, key: &str) -> Result<bool>;
}

/// Normalize a root entity name into a cache key: trimmed, lowercased,
/// whitespace runs replaced by `_`.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Open the cache store selected by the [cache] config section.
pub async fn open_store(config: &Config) -> Result<Arc<dyn GraphCacheStore>> {
    let store: Arc<dyn GraphCacheStore> = match config.cache.backend {
        CacheBackend::File => Arc::new(FileGraphCache::new(config.cache_dir())?),
        CacheBackend::Sqlite => Arc::new(SqliteGraphCache::open(Db::new(config.db_path())).await?),
        CacheBackend::Memory => Arc::new(MemoryGraphCache::new()),
    };
    log::debug!("Graph cache backend: {:?}", config.cache.backend);
    Ok(store)
}
