use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{validate_path, BlobStore, ObjectStoreError, ProgressFn, StoredBlob};

/// Progress is reported once per chunk written.
const CHUNK_SIZE: usize = 64 * 1024;

/// Directory-backed blob store for installs that keep PDFs as plain files.
pub struct DirectoryStore {
    base_path: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(base_path.as_ref())?;
        let base_path = std::fs::canonicalize(base_path.as_ref())?;
        Ok(Self { base_path })
    }

    fn object_path(&self, path: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_path(path)?;
        Ok(self.base_path.join(path))
    }
}

#[async_trait]
impl BlobStore for DirectoryStore {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        progress: Option<&ProgressFn>,
    ) -> Result<StoredBlob, ObjectStoreError> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let total = data.len();
        let mut file = tokio::fs::File::create(&target).await?;
        let mut written = 0usize;
        if let Some(progress) = progress {
            progress(0);
        }
        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await?;
            written += chunk.len();
            if let Some(progress) = progress {
                progress(((written * 100) / total.max(1)) as u8);
            }
        }
        file.flush().await?;
        if total == 0 {
            if let Some(progress) = progress {
                progress(100);
            }
        }

        Ok(StoredBlob {
            url: format!("file://{}", target.display()),
            path: path.to_string(),
            size: total as u64,
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        let target = self.object_path(path)?;
        if !tokio::fs::try_exists(&target).await? {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }
        let data = tokio::fs::read(&target).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        let target = self.object_path(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError> {
        let target = self.object_path(path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }
}
