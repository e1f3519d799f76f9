//! Blob storage adapter
//!
//! Documents are stored as opaque blobs keyed by a per-user namespaced path
//! (`<user_id>/<generated name>.<ext>`). Reads at render time go through
//! time-limited signed URLs rather than direct paths.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Storage abstraction over an opaque blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob at the given path
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Fetch a blob's contents
    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Produce a time-limited signed read URL for the blob
    fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String>;

    /// Remove a blob
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Build a namespaced storage path for an upload, keeping the original
/// file extension
pub fn blob_path(user_id: Uuid, filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    format!("{}/{}.{}", user_id, Uuid::new_v4(), ext)
}

/// Filesystem-backed blob store
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
    signing_secret: String,
}

impl FsBlobStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let signing_secret =
            config
                .url_signing_secret
                .clone()
                .ok_or_else(|| AppError::Configuration {
                    message: "storage.url_signing_secret is required".to_string(),
                })?;

        Ok(Self {
            root: PathBuf::from(&config.root),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signing_secret,
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        // Paths come from our own records, but reject traversal anyway
        if path.contains("..") || path.starts_with('/') {
            return Err(AppError::StorageError {
                message: format!("Invalid blob path: {}", path),
            });
        }
        Ok(self.root.join(path))
    }

    fn sign(&self, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_secret.as_bytes());
        hasher.update(b"\x00");
        hasher.update(path.as_bytes());
        hasher.update(b"\x00");
        hasher.update(expires.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Check a signed URL token produced by [`signed_url`](BlobStore::signed_url)
    pub fn verify_token(&self, path: &str, expires: i64, token: &str) -> bool {
        expires > chrono::Utc::now().timestamp() && self.sign(path, expires) == token
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| AppError::StorageError {
            message: format!("Failed to read blob {}: {}", path, e),
        })
    }

    fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String> {
        let expires = chrono::Utc::now().timestamp() + ttl_secs as i64;
        let token = self.sign(path, expires);
        Ok(format!(
            "{}/{}?expires={}&token={}",
            self.base_url, path, expires, token
        ))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blob store for tests. Tracks how many storage calls were made
/// so tests can assert the validation gate short-circuits before any I/O.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of storage operations performed
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.record_call();
        self.blobs
            .lock()
            .expect("lock poisoned")
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        self.record_call();
        self.blobs
            .lock()
            .expect("lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::StorageError {
                message: format!("Blob not found: {}", path),
            })
    }

    fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String> {
        Ok(format!("memory://{}?ttl={}", path, ttl_secs))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record_call();
        self.blobs.lock().expect("lock poisoned").remove(path);
        Ok(())
    }
}
