use async_trait::async_trait;
use bytes::Bytes;

use super::{validate_path, BlobStore, ObjectStoreError, ProgressFn, StoredBlob};
use crate::storage::Store;

/// Offline backend keeping content in the store's blobs collection.
pub struct EmbeddedStore {
    store: Store,
}

impl EmbeddedStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn url(path: &str) -> String {
        format!("local://{path}")
    }
}

#[async_trait]
impl BlobStore for EmbeddedStore {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        progress: Option<&ProgressFn>,
    ) -> Result<StoredBlob, ObjectStoreError> {
        validate_path(path)?;
        if let Some(progress) = progress {
            progress(0);
        }

        let size = data.len() as u64;
        self.store.save_blob(path, data)?;

        if let Some(progress) = progress {
            progress(100);
        }
        Ok(StoredBlob {
            url: Self::url(path),
            path: path.to_string(),
            size,
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        self.store
            .load_blob(path)?
            .ok_or_else(|| ObjectStoreError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        self.store.delete_blob(path)?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError> {
        Ok(self.store.load_blob(path)?.is_some())
    }
}
