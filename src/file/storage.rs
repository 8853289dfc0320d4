//! Object storage for gestor.
//!
//! File bytes live outside the database, addressed by storage key. This
//! module defines the [`ObjectStore`] trait the lifecycle coordinator talks
//! to, plus the local backends:
//! - [`FilesystemStore`]: a directory sharded by the first 2 characters of
//!   each key
//! - [`MemoryStore`]: an in-process map
//!
//! The S3 backend lives in [`super::s3`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::s3::S3Store;
use crate::config::{StorageBackend, StorageConfig};
use crate::Result;

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object under the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An object already exists under the key.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The S3 API returned an error.
    #[error("S3 error: {0}")]
    S3(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// Key cannot be stored by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Backend is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Blob store addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Write a new object. Fails with `AlreadyExists` when the key is taken;
    /// an existing object is never replaced.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Read an object.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// URL recorded alongside the file's metadata.
    fn object_url(&self, key: &str) -> String;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}

/// Build the object store selected by the configuration.
pub async fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::S3 => Arc::new(S3Store::from_config(config).await?),
        StorageBackend::Filesystem => Arc::new(FilesystemStore::new(&config.local_path)?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!("Object store backend: {}", store.backend_name());
    Ok(store)
}

/// Object store on the local filesystem.
///
/// Objects are stored in a sharded directory structure:
/// ```text
/// {base_path}/
/// ├── re/
/// │   └── report.pdf
/// ├── up/
/// │   └── uploads/
/// │       └── notes.txt
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve the on-disk path of a key.
    ///
    /// Keys must be relative and may not contain `..` components.
    pub fn object_path(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(Self::shard(key)).join(relative))
    }

    fn shard(key: &str) -> &str {
        match key.char_indices().nth(2) {
            Some((idx, _)) => &key[..idx],
            None => key,
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = write_object(&mut file, &data).await {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }
        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn object_url(&self, key: &str) -> String {
        match self.object_path(key) {
            Ok(path) => format!("file://{}", path.display()),
            Err(_) => format!("file://{}", self.base_path.display()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

async fn write_object(file: &mut tokio::fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.sync_all().await
}

/// In-process object store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StorageError {
        StorageError::Io(io::Error::other("memory store lock poisoned"))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        match objects.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(data);
                Ok(())
            }
        }
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects.contains_key(key))
    }

    fn object_url(&self, key: &str) -> String {
        format!("memory:///{key}")
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
