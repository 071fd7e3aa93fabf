mod embedded;
mod local;

pub use embedded::EmbeddedStore;
pub use local::DirectoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Upload progress in percent, 0..=100.
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredBlob {
    pub url: String,
    pub path: String,
    pub size: u64,
}

/// Abstraction over blob storage backends.
/// Paths are opaque, relative, `/`-separated; the bytes mean nothing without file metadata.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        progress: Option<&ProgressFn>,
    ) -> Result<StoredBlob, ObjectStoreError>;
    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError>;
    /// Deleting an absent path succeeds.
    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError>;
}

/// Reject empty, absolute and parent-escaping paths.
pub(crate) fn validate_path(path: &str) -> Result<(), ObjectStoreError> {
    let escapes = path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if path.is_empty() || path.starts_with('/') || path.contains('\\') || escapes {
        return Err(ObjectStoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}
