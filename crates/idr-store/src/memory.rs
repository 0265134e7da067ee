use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use idr_types::{ContactId, ContactRecord, NewContact};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::table::ContactTable;
use crate::traits::ContactStore;

/// In-memory contact store.
///
/// Intended for tests and embedding. Records live in a table behind a
/// `RwLock` and are lost when the store is dropped.
#[derive(Default)]
pub struct InMemoryContactStore {
    table: RwLock<ContactTable>,
}

impl InMemoryContactStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, soft-deleted ones included.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if no record was ever inserted.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Mark a record as soft-deleted at `at`.
    ///
    /// Deleted records stay readable through [`ContactStore::get`] but stop
    /// matching lookups.
    pub fn soft_delete(&self, id: ContactId, at: DateTime<Utc>) -> StoreResult<ContactRecord> {
        let record = self.write()?.apply_soft_delete(id, at)?;
        debug!(%id, "contact soft-deleted");
        Ok(record)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, ContactTable>> {
        self.table
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, ContactTable>> {
        self.table
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl ContactStore for InMemoryContactStore {
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.read()?.find_by_email_or_phone(email, phone_number))
    }

    fn find_by_ids_or_linked_ids(
        &self,
        roots: &BTreeSet<ContactId>,
    ) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.read()?.find_by_ids_or_linked_ids(roots))
    }

    fn insert(&self, contact: NewContact) -> StoreResult<ContactRecord> {
        let mut table = self.write()?;
        let record = table.prepare(contact, Utc::now())?;
        table.apply_insert(record.clone());
        debug!(id = %record.id, precedence = %record.link_precedence, "contact inserted");
        Ok(record)
    }

    fn get(&self, id: ContactId) -> StoreResult<Option<ContactRecord>> {
        Ok(self.read()?.get(id))
    }

    fn all(&self) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.read()?.all())
    }
}

impl std::fmt::Debug for InMemoryContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContactStore")
            .field("record_count", &self.len().ok())
            .finish()
    }
}
