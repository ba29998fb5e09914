use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::GraphCacheStore;
use crate::error::{DigfyError, Result};
use crate::graph::GraphDocument;

/// Longest key used verbatim as a file name
const MAX_PLAIN_STEM: usize = 200;

/// One JSON file per cache key in a single directory.
///
/// Writes land in a uniquely named temp file that is then renamed over the
/// entry, so readers never observe a half-written document and concurrent
/// writers to one key resolve as last-writer-wins.
pub struct FileGraphCache {
    dir: PathBuf,
}

impl FileGraphCache {
    /// Create the store, creating `dir` if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the entry file for `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Keys made only of file-name-safe characters are used as-is; anything else
/// (separators, leading dots, overlong keys) is stored under its SHA-256 hex.
fn file_stem(key: &str) -> String {
    let plain = !key.is_empty()
        && key.len() <= MAX_PLAIN_STEM
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if plain {
        key.to_string()
    } else {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[async_trait]
impl GraphCacheStore for FileGraphCache {
    async fn get(&self, key: &str) -> Option<GraphDocument> {
        let path = self.entry_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                let err = DigfyError::CacheReadFailed(format!("{}: {}", path.display(), e));
                log::warn!("{}", err);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(document) => {
                log::debug!("Cache hit: {}", path.display());
                Some(document)
            }
            Err(e) => {
                let err = DigfyError::CacheReadFailed(format!("{}: {}", path.display(), e));
                log::warn!("{} (treating as miss)", err);
                None
            }
        }
    }

    async fn put(&self, key: &str, document: &GraphDocument) -> Result<()> {
        let path = self.entry_path(key);
        let tmp_path = self
            .dir
            .join(format!("{}.{}.tmp", file_stem(key), Uuid::new_v4()));

        let bytes = serde_json::to_vec(document)?;
        let write_failed =
            |e: std::io::Error| DigfyError::CacheWriteFailed(format!("{}: {}", path.display(), e));

        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_failed(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_failed(e));
        }

        log::debug!("Cache save: {}", path.display());
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DigfyError::Io(e)),
        }
    }
}
