//! Generic record primitives over the collection tables.
//!
//! The `*_in` helpers work inside a caller's write transaction so composite operations
//! (check-then-insert, read-merge-write) commit atomically. The `Store` methods each run one
//! transaction and notify the collection's subscribers after commit.

use chrono::{DateTime, Utc};
use redb::{ReadableMultimapTable, ReadableTable, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::db::{Store, StoreError};
use super::tables::{Collection, Index};

/// A value stored in one of the collections.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    /// Primary key.
    fn key(&self) -> &str;

    /// Value this record contributes to `index`, if the index belongs to its collection.
    fn index_value(&self, _index: Index) -> Option<&str> {
        None
    }

    /// Creation stamp used for the default newest-first ordering of index queries.
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Fail with `DuplicateKey` if the primary key is taken.
    Insert,
    /// Replace any existing record wholesale.
    Upsert,
}

pub(crate) fn read_in<R: Record>(
    write_txn: &WriteTransaction,
    key: &str,
) -> Result<Option<R>, StoreError> {
    let table = write_txn.open_table(R::COLLECTION.table())?;
    let result = match table.get(key)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    Ok(result)
}

/// Primary keys stored under `value` in `index`.
pub(crate) fn lookup_in(
    write_txn: &WriteTransaction,
    index: Index,
    value: &str,
) -> Result<Vec<String>, StoreError> {
    let table = write_txn.open_multimap_table(index.table())?;
    let mut keys = Vec::new();
    for entry in table.get(value)? {
        keys.push(entry?.value().to_string());
    }
    Ok(keys)
}

pub(crate) fn query_in<R: Record>(
    write_txn: &WriteTransaction,
    index: Index,
    value: &str,
) -> Result<Vec<R>, StoreError> {
    debug_assert_eq!(index.collection(), R::COLLECTION);

    let mut records = Vec::new();
    for key in lookup_in(write_txn, index, value)? {
        if let Some(record) = read_in::<R>(write_txn, &key)? {
            records.push(record);
        }
    }
    sort_newest_first(&mut records);
    Ok(records)
}

/// Write `record` and move its index entries. Returns the record it replaced.
pub(crate) fn write_in<R: Record>(
    write_txn: &WriteTransaction,
    record: &R,
    mode: WriteMode,
) -> Result<Option<R>, StoreError> {
    let key = record.key();
    debug_assert!(!key.is_empty(), "record key must not be empty");

    let previous: Option<R> = read_in(write_txn, key)?;
    if previous.is_some() && mode == WriteMode::Insert {
        return Err(StoreError::DuplicateKey {
            collection: R::COLLECTION,
            key: key.to_string(),
        });
    }

    let indexes = R::COLLECTION.indexes();
    for &index in indexes.iter().filter(|i| i.is_unique()) {
        if let Some(value) = record.index_value(index) {
            let holders = lookup_in(write_txn, index, value)?;
            if holders.iter().any(|holder| holder != key) {
                return Err(StoreError::UniqueConstraintViolation {
                    index,
                    value: value.to_string(),
                });
            }
        }
    }

    let data = rmp_serde::to_vec_named(record)?;
    {
        let mut table = write_txn.open_table(R::COLLECTION.table())?;
        table.insert(key, data.as_slice())?;
    }

    for &index in indexes {
        let mut index_table = write_txn.open_multimap_table(index.table())?;
        if let Some(old) = previous.as_ref().and_then(|p| p.index_value(index)) {
            index_table.remove(old, key)?;
        }
        if let Some(new) = record.index_value(index) {
            index_table.insert(new, key)?;
        }
    }

    Ok(previous)
}

/// Remove the record under `key` with its index entries. Absence is not an error.
pub(crate) fn remove_in<R: Record>(
    write_txn: &WriteTransaction,
    key: &str,
) -> Result<Option<R>, StoreError> {
    let previous: Option<R> = read_in(write_txn, key)?;
    let Some(previous) = previous else {
        return Ok(None);
    };

    {
        let mut table = write_txn.open_table(R::COLLECTION.table())?;
        table.remove(key)?;
    }

    for &index in R::COLLECTION.indexes() {
        if let Some(value) = previous.index_value(index) {
            let mut index_table = write_txn.open_multimap_table(index.table())?;
            index_table.remove(value, key)?;
        }
    }

    Ok(Some(previous))
}

fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}

impl Store {
    // ========================================================================
    // Generic record operations
    // ========================================================================

    /// Insert a new record; fails on a taken primary key or unique index value.
    pub fn insert<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        self.mutate(&[R::COLLECTION], |write_txn| {
            write_in(write_txn, record, WriteMode::Insert)
        })?;
        tracing::debug!(collection = %R::COLLECTION, key = record.key(), "Inserted record");
        Ok(())
    }

    /// Upsert by primary key, replacing the stored record wholesale.
    pub fn put<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        self.mutate(&[R::COLLECTION], |write_txn| {
            write_in(write_txn, record, WriteMode::Upsert)
        })?;
        tracing::debug!(collection = %R::COLLECTION, key = record.key(), "Put record");
        Ok(())
    }

    pub fn get_by_key<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(R::COLLECTION.table())?;

        match table.get(key)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All records whose `index` value equals `value`, newest first.
    pub fn query_by_index<R: Record>(&self, index: Index, value: &str) -> Result<Vec<R>, StoreError> {
        debug_assert_eq!(index.collection(), R::COLLECTION);

        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_multimap_table(index.table())?;
        let table = read_txn.open_table(R::COLLECTION.table())?;

        let mut records = Vec::new();
        for entry in index_table.get(value)? {
            let entry = entry?;
            if let Some(data) = table.get(entry.value())? {
                records.push(rmp_serde::from_slice::<R>(data.value())?);
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Delete by primary key. Returns whether a record was removed.
    pub fn delete_by_key<R: Record>(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.mutate(&[R::COLLECTION], |write_txn| remove_in::<R>(write_txn, key))?;
        tracing::debug!(collection = %R::COLLECTION, key, removed = removed.is_some(), "Deleted record");
        Ok(removed.is_some())
    }
}
