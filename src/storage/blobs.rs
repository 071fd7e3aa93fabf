use bytes::Bytes;

use super::db::{Store, StoreError};
use super::models::FileBlob;

impl Store {
    // ========================================================================
    // Blob operations
    // ========================================================================

    /// Store `content` under `storage_path`, replacing anything already there.
    pub fn save_blob(&self, storage_path: &str, content: Bytes) -> Result<(), StoreError> {
        self.put(&FileBlob {
            storage_path: storage_path.to_string(),
            content,
        })
    }

    pub fn load_blob(&self, storage_path: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .get_by_key::<FileBlob>(storage_path)?
            .map(|blob| blob.content))
    }

    pub fn delete_blob(&self, storage_path: &str) -> Result<bool, StoreError> {
        self.delete_by_key::<FileBlob>(storage_path)
    }
}
