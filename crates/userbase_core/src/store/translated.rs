//! Naming-translation wrapper around a [`StorageTable`].

use super::{Record, StorageTable, StoreResult};
use crate::naming::{record_to_external, record_to_storage, records_to_external};

/// Storage table as seen from the external naming convention.
///
/// Every value map handed in is re-keyed with [`crate::naming::to_storage`]
/// and every row handed back with [`crate::naming::to_external`]. Identifier
/// values pass through untouched.
pub struct TranslatingTable<S> {
    inner: S,
}

impl<S: StorageTable> TranslatingTable<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn select_all(&self) -> StoreResult<Vec<Record>> {
        self.inner.select_all().map(records_to_external)
    }

    pub fn select_by_id(&self, id: &str) -> StoreResult<Vec<Record>> {
        self.inner.select_by_id(id).map(records_to_external)
    }

    pub fn insert_returning(&self, values: &Record) -> StoreResult<Record> {
        self.inner
            .insert_returning(&record_to_storage(values))
            .map(record_to_external)
    }

    pub fn update_by_id_returning(&self, id: &str, values: &Record) -> StoreResult<Vec<Record>> {
        self.inner
            .update_by_id_returning(id, &record_to_storage(values))
            .map(records_to_external)
    }

    pub fn delete_by_id_returning(&self, id: &str) -> StoreResult<Vec<Record>> {
        self.inner
            .delete_by_id_returning(id)
            .map(records_to_external)
    }
}
