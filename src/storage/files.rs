use chrono::Utc;

use super::db::{Store, StoreError};
use super::engine::{read_in, write_in, WriteMode};
use super::models::{FileMetadata, FilePatch, NewFile};
use super::tables::{Collection, Index};

impl Store {
    // ========================================================================
    // File metadata operations
    // ========================================================================

    /// Record a new file for `user_id` in `subject_id`. Starts unstarred.
    pub fn create_file(
        &self,
        user_id: &str,
        subject_id: &str,
        new_file: NewFile,
    ) -> Result<FileMetadata, StoreError> {
        let file = FileMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            subject_id: subject_id.to_string(),
            name: new_file.name,
            url: new_file.url,
            size: new_file.size,
            mime_type: new_file.mime_type,
            storage_path: new_file.storage_path,
            is_starred: false,
            created_at: Utc::now(),
        };

        self.insert(&file)?;
        Ok(file)
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileMetadata>, StoreError> {
        self.get_by_key(id)
    }

    /// Every file owned by `user_id`, newest first.
    pub fn list_files(&self, user_id: &str) -> Result<Vec<FileMetadata>, StoreError> {
        self.query_by_index(Index::FileOwner, user_id)
    }

    /// Files owned by `user_id` in `subject_id`, newest first. Filters the owner index result
    /// rather than trusting the subject index, so another user's rows can never leak in.
    pub fn list_files_in_subject(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<Vec<FileMetadata>, StoreError> {
        let mut files = self.list_files(user_id)?;
        files.retain(|f| f.subject_id == subject_id);
        Ok(files)
    }

    pub fn delete_file(&self, id: &str) -> Result<bool, StoreError> {
        self.delete_by_key::<FileMetadata>(id)
    }

    /// Merge `patch` onto the stored file and write it back. Fails with `NotFound` if absent.
    pub fn update_file(&self, id: &str, patch: &FilePatch) -> Result<FileMetadata, StoreError> {
        let updated = self.mutate(&[Collection::Files], |write_txn| {
            let mut file: FileMetadata = read_in(write_txn, id)?
                .ok_or_else(|| StoreError::not_found(Collection::Files, id))?;
            patch.apply(&mut file);
            write_in(write_txn, &file, WriteMode::Upsert)?;
            Ok(file)
        })?;

        tracing::debug!(file_id = %id, "Updated file");
        Ok(updated)
    }

    /// Flip `is_starred` against the stored value, not a caller's possibly stale copy.
    pub fn toggle_star(&self, id: &str) -> Result<FileMetadata, StoreError> {
        self.mutate(&[Collection::Files], |write_txn| {
            let mut file: FileMetadata = read_in(write_txn, id)?
                .ok_or_else(|| StoreError::not_found(Collection::Files, id))?;
            file.is_starred = !file.is_starred;
            write_in(write_txn, &file, WriteMode::Upsert)?;
            Ok(file)
        })
    }

    pub fn rename_file(&self, id: &str, name: &str) -> Result<FileMetadata, StoreError> {
        self.update_file(id, &FilePatch::rename(name))
    }
}
