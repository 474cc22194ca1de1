//! Append-Only Byte Stores
//!
//! The sink stage persists the encoded stream through the [`ByteStore`]
//! trait: an opaque destination that accepts atomic appends and a final
//! durability flush. Stores never seek and never rewrite; the compressed
//! container arrives strictly in stream order.
//!
//! Two implementations ship with the crate:
//!
//! - [`FileStore`]: a freshly created (truncated) local file, flushed and
//!   fsynced on finalize. This is the production store.
//! - [`MemoryStore`]: an in-memory buffer with a shared inspection handle,
//!   for tests and embedding.
//!
//! The store is owned by the sink stage; on any exit path the owning `Box`
//! drops and the underlying handle closes with it. `finalize` is only
//! called on the success path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Error, Result};

/// Opaque append-only destination for the encoded stream.
#[async_trait]
pub trait ByteStore: Send {
    /// Persist `data` as one atomic append.
    async fn append(&mut self, data: &[u8]) -> Result<()>;

    /// Flush buffered data and make the stream durable.
    async fn finalize(&mut self) -> Result<()>;

    /// Human-readable destination for logs.
    fn describe(&self) -> String;
}

/// Append-only store backed by a local file.
pub struct FileStore {
    path: PathBuf,
    file: File,
}

impl FileStore {
    /// Create the file at `path` for exclusive writing, truncating any
    /// previous contents. Missing parent directories are created.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(Error::Storage)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(Error::Storage)?;

        debug!(path = %path.display(), "file store opened");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteStore for FileStore {
    async fn append(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data).await.map_err(Error::Storage)
    }

    async fn finalize(&mut self) -> Result<()> {
        self.file.flush().await.map_err(Error::Storage)?;
        // fsync, not fdatasync: the file is brand new, so its length
        // metadata matters as much as the data.
        self.file.sync_all().await.map_err(Error::Storage)?;
        debug!(path = %self.path.display(), "file store finalized");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// In-memory store whose contents outlive the pipeline via a handle.
#[derive(Default)]
pub struct MemoryStore {
    contents: Arc<Mutex<Vec<u8>>>,
    finalized: Arc<AtomicBool>,
}

/// Cloneable inspection handle for a [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryStoreHandle {
    contents: Arc<Mutex<Vec<u8>>>,
    finalized: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemoryStoreHandle {
        MemoryStoreHandle {
            contents: self.contents.clone(),
            finalized: self.finalized.clone(),
        }
    }
}

impl MemoryStoreHandle {
    /// Copy of everything appended so far.
    pub async fn contents(&self) -> Vec<u8> {
        self.contents.lock().await.clone()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ByteStore for MemoryStore {
    async fn append(&mut self, data: &[u8]) -> Result<()> {
        self.contents.lock().await.extend_from_slice(data);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.finalized.store(true, Ordering::Release);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut store = FileStore::create(&path).await.unwrap();
        store.append(b"first ").await.unwrap();
        store.append(b"second").await.unwrap();
        store.finalize().await.unwrap();
        drop(store);

        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(&written[..], b"first second");
    }

    #[tokio::test]
    async fn test_file_store_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        tokio::fs::write(&path, b"stale data from a previous run")
            .await
            .unwrap();

        let mut store = FileStore::create(&path).await.unwrap();
        store.append(b"new").await.unwrap();
        store.finalize().await.unwrap();
        drop(store);

        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(&written[..], b"new");
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/out.bin");

        let mut store = FileStore::create(&path).await.unwrap();
        store.append(b"x").await.unwrap();
        store.finalize().await.unwrap();

        assert!(path.exists());
        assert!(store.describe().starts_with("file://"));
    }

    #[tokio::test]
    async fn test_memory_store_tracks_contents_and_finalize() {
        let mut store = MemoryStore::new();
        let handle = store.handle();

        store.append(b"abc").await.unwrap();
        store.append(b"def").await.unwrap();
        assert!(!handle.is_finalized());

        store.finalize().await.unwrap();
        drop(store);

        assert_eq!(handle.contents().await, b"abcdef");
        assert!(handle.is_finalized());
    }
}
