use std::fmt;

use redb::{MultimapTableDefinition, TableDefinition};
use serde::{Deserialize, Serialize};

/// Current on-disk schema. Upgrades may only add tables.
pub const SCHEMA_VERSION: u64 = 1;

/// Schema bookkeeping: key -> value (currently only "schema_version")
pub const SCHEMA_META: TableDefinition<&str, u64> = TableDefinition::new("schema_meta");

/// The four record collections of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Subjects,
    Files,
    Blobs,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Subjects,
        Collection::Files,
        Collection::Blobs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Subjects => "subjects",
            Collection::Files => "files",
            Collection::Blobs => "blobs",
        }
    }

    /// Primary table: key -> record (msgpack)
    pub(crate) fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(self.name())
    }

    /// Secondary indexes maintained for this collection.
    pub fn indexes(self) -> &'static [Index] {
        match self {
            Collection::Users => &[Index::UserEmail],
            Collection::Subjects => &[Index::SubjectOwner],
            Collection::Files => &[Index::FileOwner, Index::FileSubject],
            Collection::Blobs => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Secondary indexes: indexed value -> primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// users.email (unique)
    UserEmail,
    /// subjects.user_id
    SubjectOwner,
    /// files.user_id
    FileOwner,
    /// files.subject_id
    FileSubject,
}

impl Index {
    pub fn name(self) -> &'static str {
        match self {
            Index::UserEmail => "users_by_email",
            Index::SubjectOwner => "subjects_by_user_id",
            Index::FileOwner => "files_by_user_id",
            Index::FileSubject => "files_by_subject_id",
        }
    }

    pub fn collection(self) -> Collection {
        match self {
            Index::UserEmail => Collection::Users,
            Index::SubjectOwner => Collection::Subjects,
            Index::FileOwner | Index::FileSubject => Collection::Files,
        }
    }

    pub fn is_unique(self) -> bool {
        matches!(self, Index::UserEmail)
    }

    pub(crate) fn table(self) -> MultimapTableDefinition<'static, &'static str, &'static str> {
        MultimapTableDefinition::new(self.name())
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
