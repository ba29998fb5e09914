use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::GraphCacheStore;
use crate::error::Result;
use crate::graph::GraphDocument;

/// Process-local graph cache
///
/// Entries live as long as the store; nothing is evicted implicitly.
pub struct MemoryGraphCache {
    inner: RwLock<HashMap<String, GraphDocument>>,
}

impl MemoryGraphCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached graphs
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryGraphCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphCacheStore for MemoryGraphCache {
    async fn get(&self, key: &str) -> Option<GraphDocument> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    async fn put(&self, key: &str, document: &GraphDocument) -> Result<()> {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), document.clone());
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some())
    }
}
