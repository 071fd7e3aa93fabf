use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;
use crate::notify::NotificationRegistry;

const DB_FILE_NAME: &str = "pdf-library.redb";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Duplicate key in {collection}: {key}")]
    DuplicateKey { collection: Collection, key: String },
    #[error("Unique constraint violated on {index}: {value}")]
    UniqueConstraintViolation { index: Index, value: String },
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("Not found in {collection}: {key}")]
    NotFound { collection: Collection, key: String },
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Transaction failed: {0}")]
    TransactionFailed(Box<redb::Error>),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl StoreError {
    pub(crate) fn not_found(collection: Collection, key: &str) -> Self {
        StoreError::NotFound {
            collection,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<redb::Error> for StoreError {
    fn from(e: redb::Error) -> Self {
        StoreError::TransactionFailed(Box::new(e))
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::TransactionFailed(Box::new(e.into()))
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::TransactionFailed(Box::new(e.into()))
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::TransactionFailed(Box::new(e.into()))
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::TransactionFailed(Box::new(e.into()))
    }
}

/// Tunables fixed at open time.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// PBKDF2 iterations used when hashing new passwords. Existing hashes keep their own count.
    pub password_iterations: NonZeroU32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            password_iterations: NonZeroU32::new(600_000).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// Handle to the embedded store. Clones share the engine and the notification registry.
#[derive(Clone)]
pub struct Store {
    db: Arc<RedbDatabase>,
    registry: Arc<NotificationRegistry>,
    options: StoreOptions,
}

/// Statistics from a purge operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    pub users: u64,
    pub subjects: u64,
    pub files: u64,
    pub blobs: u64,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        Self::open_with(data_dir, StoreOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(data_dir: P, options: StoreOptions) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::StoreUnavailable(format!("cannot create {}: {e}", data_dir.display()))
        })?;
        let db_path = data_dir.join(DB_FILE_NAME);
        let db = RedbDatabase::create(&db_path)
            .map_err(|e| StoreError::StoreUnavailable(format!("{}: {e}", db_path.display())))?;

        let store = Self {
            db: Arc::new(db),
            registry: Arc::new(NotificationRegistry::new()),
            options,
        };
        store.ensure_schema()?;

        tracing::info!(path = %db_path.display(), version = SCHEMA_VERSION, "Store opened");
        Ok(store)
    }

    /// Create missing tables and record the schema version. Never drops anything.
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let write_txn = self.begin_write()?;
        {
            let mut meta = write_txn.open_table(SCHEMA_META)?;
            let stored = meta.get("schema_version")?.map(|v| v.value());
            if let Some(version) = stored {
                if version > SCHEMA_VERSION {
                    return Err(StoreError::StoreUnavailable(format!(
                        "schema version {version} is newer than supported version {SCHEMA_VERSION}"
                    )));
                }
            }

            for collection in Collection::ALL {
                let _ = write_txn.open_table(collection.table())?;
                for index in collection.indexes() {
                    let _ = write_txn.open_multimap_table(index.table())?;
                }
            }
            meta.insert("schema_version", SCHEMA_VERSION)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Version recorded in the open file.
    pub fn schema_version(&self) -> Result<u64, StoreError> {
        let read_txn = self.begin_read()?;
        let meta = read_txn.open_table(SCHEMA_META)?;
        let version = meta.get("schema_version")?.map(|v| v.value());
        Ok(version.unwrap_or(0))
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, StoreError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, StoreError> {
        Ok(self.db.begin_write()?)
    }

    /// Run `f` in one write transaction, commit, then notify subscribers of `touched`.
    /// An error from `f` aborts the transaction and nothing is notified.
    pub(crate) fn mutate<T>(
        &self,
        touched: &[Collection],
        f: impl FnOnce(&WriteTransaction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let write_txn = self.begin_write()?;
        let out = f(&write_txn)?;
        write_txn.commit()?;

        for collection in touched {
            self.registry.notify(*collection);
        }
        Ok(out)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all data - for testing only
    pub fn purge_all(&self) -> Result<PurgeStats, StoreError> {
        self.mutate(&Collection::ALL, |write_txn| {
            let mut stats = PurgeStats::default();

            for collection in Collection::ALL {
                let count = write_txn.open_table(collection.table())?.iter()?.count() as u64;
                write_txn.delete_table(collection.table())?;
                let _ = write_txn.open_table(collection.table())?;

                for index in collection.indexes() {
                    write_txn.delete_multimap_table(index.table())?;
                    let _ = write_txn.open_multimap_table(index.table())?;
                }

                match collection {
                    Collection::Users => stats.users = count,
                    Collection::Subjects => stats.subjects = count,
                    Collection::Files => stats.files = count,
                    Collection::Blobs => stats.blobs = count,
                }
            }

            Ok(stats)
        })
    }
}
