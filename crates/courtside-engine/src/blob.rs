//! Opaque key-value blob stores backing the availability cache.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use courtside_providers::BoxFuture;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::EngineResult;

/// Distinguishes temp files of concurrent writes within one process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A store of opaque byte blobs keyed by string.
pub trait BlobStore: Send + Sync {
    /// Returns the blob for `key`, or `None` if absent.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, EngineResult<Option<Vec<u8>>>>;

    /// Stores `bytes` under `key`, replacing any previous blob.
    fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, EngineResult<()>>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, EngineResult<()>>;
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, EngineResult<Option<Vec<u8>>>> {
        Box::pin(async move { Ok(self.blobs.read().await.get(key).cloned()) })
    }

    fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            self.blobs.write().await.insert(key.to_string(), bytes);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            self.blobs.write().await.remove(key);
            Ok(())
        })
    }
}

/// Filesystem blob store: one file per key under a directory.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so readers never observe a partial blob. Every write gets its own
/// temp file; concurrent writes of one key leave the last rename in place.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob key: {:?}", key),
            ));
        }
        Ok(self.dir.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, EngineResult<Option<Vec<u8>>>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    trace!(path = %path.display(), bytes = bytes.len(), "Read blob");
                    Ok(Some(bytes))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            tokio::fs::create_dir_all(&self.dir).await?;

            let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
            let tmp = self
                .dir
                .join(format!(".{}.{}.{}.tmp", key, std::process::id(), seq));
            tokio::fs::write(&tmp, &bytes).await?;
            if let Err(e) = tokio::fs::rename(&tmp, &path).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e.into());
            }
            trace!(path = %path.display(), bytes = bytes.len(), "Wrote blob");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert!(store.get("2025-05-all.json").await.unwrap().is_none());

        store.put("2025-05-all.json", b"one".to_vec()).await.unwrap();
        store.put("2025-05-all.json", b"two".to_vec()).await.unwrap();
        assert_eq!(
            store.get("2025-05-all.json").await.unwrap().as_deref(),
            Some(&b"two"[..])
        );
        assert_eq!(store.len().await, 1);

        store.delete("2025-05-all.json").await.unwrap();
        store.delete("2025-05-all.json").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn fs_store_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("cache"));

        assert!(store.get("2025-05-all.json").await.unwrap().is_none());
        store.put("2025-05-all.json", b"first".to_vec()).await.unwrap();
        store.put("2025-05-all.json", b"second".to_vec()).await.unwrap();

        assert_eq!(
            store.get("2025-05-all.json").await.unwrap().as_deref(),
            Some(&b"second"[..])
        );
        let names: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["2025-05-all.json".to_string()]);

        store.delete("2025-05-all.json").await.unwrap();
        assert!(store.get("2025-05-all.json").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_of_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsBlobStore::new(dir.path()));
        let first = vec![b'a'; 64 * 1024];
        let second = vec![b'b'; 64 * 1024];

        for _ in 0..50 {
            let writers: Vec<_> = [first.clone(), second.clone()]
                .into_iter()
                .map(|bytes| {
                    let store = store.clone();
                    tokio::spawn(async move { store.put("2025-05-all.json", bytes).await })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let stored = store.get("2025-05-all.json").await.unwrap().unwrap();
            assert!(stored == first || stored == second);
        }

        let names: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["2025-05-all.json".to_string()]);
    }

    #[tokio::test]
    async fn fs_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.put("../escape", Vec::new()).await.is_err());
        assert!(store.get("a/b").await.is_err());
    }
}
