use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::Record;
use super::tables::{Collection, Index};

/// Default colour given to a subject created without one.
pub const DEFAULT_SUBJECT_COLOR: &str = "#4f46e5";

/// A user account as stored, including the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// A user account with the credential removed, as returned by signup and login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            created_at: user.created_at,
        }
    }
}

/// A named folder of files, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata for an uploaded file. The content lives in the blob store under `storage_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub user_id: String,
    pub subject_id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_path: String,
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new file; ownership, id, star state and timestamp are stamped
/// by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_path: String,
}

/// Partial update for a file. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_starred: Option<bool>,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl FilePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        FilePatch {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn star(is_starred: bool) -> Self {
        FilePatch {
            is_starred: Some(is_starred),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.is_starred.is_none()
            && self.subject_id.is_none()
            && self.url.is_none()
    }

    /// Merge the present fields onto `file`.
    pub fn apply(&self, file: &mut FileMetadata) {
        if let Some(ref name) = self.name {
            file.name = name.clone();
        }
        if let Some(is_starred) = self.is_starred {
            file.is_starred = is_starred;
        }
        if let Some(ref subject_id) = self.subject_id {
            file.subject_id = subject_id.clone();
        }
        if let Some(ref url) = self.url {
            file.url = url.clone();
        }
    }
}

/// Binary content of a file in offline mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlob {
    pub storage_path: String,
    pub content: Bytes,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn key(&self) -> &str {
        &self.uid
    }

    fn index_value(&self, index: Index) -> Option<&str> {
        match index {
            Index::UserEmail => Some(&self.email),
            _ => None,
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Record for Subject {
    const COLLECTION: Collection = Collection::Subjects;

    fn key(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: Index) -> Option<&str> {
        match index {
            Index::SubjectOwner => Some(&self.user_id),
            _ => None,
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Record for FileMetadata {
    const COLLECTION: Collection = Collection::Files;

    fn key(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: Index) -> Option<&str> {
        match index {
            Index::FileOwner => Some(&self.user_id),
            Index::FileSubject => Some(&self.subject_id),
            _ => None,
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Record for FileBlob {
    const COLLECTION: Collection = Collection::Blobs;

    fn key(&self) -> &str {
        &self.storage_path
    }
}
