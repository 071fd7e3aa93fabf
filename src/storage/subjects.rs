use chrono::Utc;

use super::db::{Store, StoreError};
use super::engine::{query_in, remove_in};
use super::models::{FileMetadata, Subject, DEFAULT_SUBJECT_COLOR};
use super::tables::{Collection, Index};

impl Store {
    // ========================================================================
    // Subject operations
    // ========================================================================

    pub fn create_subject(
        &self,
        user_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> Result<Subject, StoreError> {
        let subject = Subject {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            color: color.unwrap_or(DEFAULT_SUBJECT_COLOR).to_string(),
            created_at: Utc::now(),
        };

        self.insert(&subject)?;
        Ok(subject)
    }

    pub fn get_subject(&self, id: &str) -> Result<Option<Subject>, StoreError> {
        self.get_by_key(id)
    }

    /// Subjects owned by `user_id`, newest first.
    pub fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>, StoreError> {
        self.query_by_index(Index::SubjectOwner, user_id)
    }

    /// Delete a subject. Its files are left in place; see `Library::delete_subject` for the
    /// cascading variant.
    pub fn delete_subject(&self, id: &str) -> Result<bool, StoreError> {
        self.delete_by_key::<Subject>(id)
    }

    /// Delete a subject together with the files `user_id` keeps in it, in one transaction.
    /// Returns the removed file records so the caller can release their blobs.
    pub fn delete_subject_with_files(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Vec<FileMetadata>, StoreError> {
        let removed = self.mutate(&[Collection::Subjects, Collection::Files], |write_txn| {
            let files: Vec<FileMetadata> = query_in(write_txn, Index::FileSubject, id)?;

            let mut removed = Vec::new();
            for file in files.into_iter().filter(|f| f.user_id == user_id) {
                if let Some(file) = remove_in::<FileMetadata>(write_txn, &file.id)? {
                    removed.push(file);
                }
            }
            remove_in::<Subject>(write_txn, id)?;
            Ok(removed)
        })?;

        tracing::debug!(subject_id = %id, files = removed.len(), "Deleted subject with files");
        Ok(removed)
    }
}
