//! Storage backends for uploaded files

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sd_core::error::SdError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for SdError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => SdError::not_found("File", key),
            StorageError::InvalidPath(path) => SdError::invalid("images", format!("invalid file name {path}")),
            other => SdError::ExternalService {
                service: "storage".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// A file written to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub key: String,
    /// Public URL recorded on the owning record
    pub url: String,
    pub size: u64,
    /// SHA-256, hex encoded
    pub digest: String,
    pub content_type: String,
}

/// Storage backend trait
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write `data` under a fresh unique key derived from `original_name`
    async fn store(
        &self,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredFile>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

pub fn calculate_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Keep the file name's last path segment, restricted to a safe alphabet
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<uuid>-<sanitized name>`
pub fn unique_key(original_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(original_name))
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Local filesystem storage
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.contains(['/', '\\']) {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    #[instrument(skip(self, data), fields(storage = "local", size = data.len()))]
    async fn store(
        &self,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredFile> {
        let key = unique_key(original_name);
        let path = self.resolve_path(&key)?;
        fs::create_dir_all(&self.root).await?;

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!(key = %key, "Stored file");
        Ok(StoredFile {
            url: public_url(&self.public_base_url, &key),
            key,
            size: data.len() as u64,
            digest: calculate_digest(&data),
            content_type: content_type.to_string(),
        })
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.resolve_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// In-memory storage (tests, servers without an upload directory)
#[derive(Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Bytes>>,
    public_base_url: String,
}

impl MemoryStorage {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn store(
        &self,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredFile> {
        let key = unique_key(original_name);
        let stored = StoredFile {
            url: public_url(&self.public_base_url, &key),
            key: key.clone(),
            size: data.len() as u64,
            digest: calculate_digest(&data),
            content_type: content_type.to_string(),
        };
        self.files.write().await.insert(key, data);
        Ok(stored)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.files
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.files
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
