//! User-facing workflows composed from the store and a blob backend: PDF upload, deletion
//! with blob cleanup, and the per-user views (search, recent, favorites, stats).

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::object_store::{BlobStore, ObjectStoreError, ProgressFn};
use crate::storage::models::{FileMetadata, NewFile};
use crate::storage::{Collection, Store, StoreError};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Default size of the recent-files view.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Blob storage error: {0}")]
    Blob(#[from] ObjectStoreError),
    #[error("Only PDF files are allowed (got {0})")]
    UnsupportedType(String),
}

/// A file as received from the client, before it is stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    /// Declared content type, if the client sent one.
    pub content_type: Option<String>,
    pub content: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub subjects: u64,
    pub files: u64,
    pub starred_files: u64,
    pub total_bytes: u64,
}

#[derive(Clone)]
pub struct Library {
    store: Store,
    blobs: Arc<dyn BlobStore>,
}

impl Library {
    pub fn new(store: Store, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Store a PDF's bytes, then its metadata. If the metadata write fails the bytes are
    /// removed again.
    pub async fn upload_pdf(
        &self,
        user_id: &str,
        subject_id: &str,
        upload: Upload,
        progress: Option<&ProgressFn>,
    ) -> Result<FileMetadata, LibraryError> {
        let mime_type = resolve_mime_type(&upload.name, upload.content_type.as_deref());
        if mime_type != PDF_MIME_TYPE {
            return Err(LibraryError::UnsupportedType(mime_type));
        }

        let storage_path = format!("{user_id}/{}.pdf", uuid::Uuid::new_v4());
        let stored = self
            .blobs
            .upload(&storage_path, upload.content, progress)
            .await?;

        let new_file = NewFile {
            name: upload.name,
            url: stored.url,
            size: stored.size,
            mime_type,
            storage_path: stored.path,
        };
        match self.store.create_file(user_id, subject_id, new_file) {
            Ok(file) => {
                tracing::debug!(file_id = %file.id, subject_id, size = file.size, "Uploaded PDF");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&storage_path).await {
                    tracing::warn!(path = %storage_path, error = %cleanup, "Failed to remove orphaned blob");
                }
                Err(e.into())
            }
        }
    }

    /// The file, if it exists and belongs to `user_id`.
    pub fn owned_file(&self, user_id: &str, file_id: &str) -> Result<FileMetadata, LibraryError> {
        match self.store.get_file(file_id)? {
            Some(file) if file.user_id == user_id => Ok(file),
            _ => Err(StoreError::NotFound {
                collection: Collection::Files,
                key: file_id.to_string(),
            }
            .into()),
        }
    }

    /// Content of one of `user_id`'s files.
    pub async fn read_content(
        &self,
        user_id: &str,
        file_id: &str,
    ) -> Result<(FileMetadata, Bytes), LibraryError> {
        let file = self.owned_file(user_id, file_id)?;
        let data = self.blobs.get(&file.storage_path).await?;
        Ok((file, data))
    }

    /// Remove a file's blob (best-effort) and its metadata.
    pub async fn delete_file(&self, user_id: &str, file_id: &str) -> Result<(), LibraryError> {
        let file = self.owned_file(user_id, file_id)?;
        self.release_blob(&file).await;
        self.store.delete_file(&file.id)?;

        tracing::debug!(file_id = %file.id, "Deleted file");
        Ok(())
    }

    /// Delete a subject with every file `user_id` keeps in it, blobs included.
    pub async fn delete_subject(&self, user_id: &str, subject_id: &str) -> Result<(), LibraryError> {
        match self.store.get_subject(subject_id)? {
            Some(subject) if subject.user_id == user_id => {}
            _ => {
                return Err(StoreError::NotFound {
                    collection: Collection::Subjects,
                    key: subject_id.to_string(),
                }
                .into())
            }
        }

        let removed = self.store.delete_subject_with_files(user_id, subject_id)?;
        for file in &removed {
            self.release_blob(file).await;
        }
        Ok(())
    }

    async fn release_blob(&self, file: &FileMetadata) {
        if file.storage_path.is_empty() {
            return;
        }
        if let Err(e) = self.blobs.delete(&file.storage_path).await {
            tracing::warn!(file_id = %file.id, path = %file.storage_path, error = %e, "Failed to delete file content");
        }
    }

    /// Files whose name contains `term`, ignoring case. A blank term matches nothing.
    pub fn search(&self, user_id: &str, term: &str) -> Result<Vec<FileMetadata>, LibraryError> {
        Ok(filter_by_name(self.store.list_files(user_id)?, term))
    }

    pub fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<FileMetadata>, LibraryError> {
        let mut files = self.store.list_files(user_id)?;
        files.truncate(limit);
        Ok(files)
    }

    pub fn favorites(&self, user_id: &str) -> Result<Vec<FileMetadata>, LibraryError> {
        let mut files = self.store.list_files(user_id)?;
        files.retain(|f| f.is_starred);
        Ok(files)
    }

    pub fn stats(&self, user_id: &str) -> Result<LibraryStats, LibraryError> {
        let subjects = self.store.list_subjects(user_id)?;
        let files = self.store.list_files(user_id)?;

        Ok(LibraryStats {
            subjects: subjects.len() as u64,
            files: files.len() as u64,
            starred_files: files.iter().filter(|f| f.is_starred).count() as u64,
            total_bytes: files.iter().map(|f| f.size).sum(),
        })
    }
}

/// Declared content type, or a guess from the file name when the client sent nothing useful.
pub fn resolve_mime_type(name: &str, declared: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(|ct| ct.to_ascii_lowercase())
        .or_else(|| mime_guess::from_path(name).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub fn filter_by_name(files: Vec<FileMetadata>, term: &str) -> Vec<FileMetadata> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    files
        .into_iter()
        .filter(|f| f.name.to_lowercase().contains(&term))
        .collect()
}
