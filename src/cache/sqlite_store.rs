use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::GraphCacheStore;
use crate::db::{migrate, Db};
use crate::error::{DigfyError, Result};
use crate::graph::GraphDocument;

/// Graph cache backed by the `graph_cache` table
pub struct SqliteGraphCache {
    db: Db,
}

impl SqliteGraphCache {
    /// Open the store, applying pending migrations
    pub async fn open(db: Db) -> Result<Self> {
        db.with_connection(migrate::run_migrations).await?;
        Ok(Self { db })
    }

    /// Number of cached graphs
    pub async fn len(&self) -> Result<usize> {
        self.db
            .with_connection(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM graph_cache", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
    }
}

#[async_trait]
impl GraphCacheStore for SqliteGraphCache {
    async fn get(&self, key: &str) -> Option<GraphDocument> {
        let cache_key = key.to_string();
        let row = self
            .db
            .with_connection(move |conn| {
                let json: Option<String> = conn
                    .query_row(
                        "SELECT document_json FROM graph_cache WHERE cache_key = ?1",
                        [&cache_key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(json)
            })
            .await;

        let json = match row {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("{}", DigfyError::CacheReadFailed(format!("{}: {}", key, e)));
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(document) => {
                log::debug!("Cache hit: {}", key);
                Some(document)
            }
            Err(e) => {
                log::warn!(
                    "{} (treating as miss)",
                    DigfyError::CacheReadFailed(format!("{}: {}", key, e))
                );
                None
            }
        }
    }

    async fn put(&self, key: &str, document: &GraphDocument) -> Result<()> {
        let cache_key = key.to_string();
        let json = serde_json::to_string(document)?;
        let cached_at = chrono::Utc::now().to_rfc3339();

        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT INTO graph_cache (cache_key, document_json, cached_at) \
                     VALUES (?1, ?2, ?3) \
                     ON CONFLICT(cache_key) DO UPDATE SET \
                     document_json = excluded.document_json, cached_at = excluded.cached_at",
                    params![cache_key, json, cached_at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| DigfyError::CacheWriteFailed(format!("{}: {}", key, e)))?;

        log::debug!("Cache save: {}", key);
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        let cache_key = key.to_string();
        self.db
            .with_connection(move |conn| {
                let removed =
                    conn.execute("DELETE FROM graph_cache WHERE cache_key = ?1", [&cache_key])?;
                Ok(removed > 0)
            })
            .await
    }
}
