//! In-memory permission store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use warden_core::{Record, Result, ScopeAnnotations};

use crate::backend::{PermStore, SetEntry};

/// In-memory reference backend.
///
/// Records are kept behind a single `RwLock`; the write lock serializes
/// mutations per key (coarsely, for the whole map), and every read hands
/// out a clone, so concurrent resolutions never alias a record that a
/// mutator might touch.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records, for tests and fixtures.
    pub fn with_records(records: HashMap<String, Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Record>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Record>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PermStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Record>> {
        Ok(self.read().get(key).cloned())
    }

    async fn set_add(
        &self,
        key: &str,
        entry: SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Record> {
        let mut records = self.write();
        let record = records.entry(key.to_string()).or_default();
        record.correct_scope(&scope);
        let changed = match entry {
            SetEntry::Perm(rule) => record.add_perm(rule),
            SetEntry::Group(group) => record.add_group(group),
        };
        if !changed {
            log::debug!("set_add on '{key}' was a no-op (entry already present)");
        }
        Ok(record.clone())
    }

    async fn set_remove(
        &self,
        key: &str,
        entry: &SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Option<Record>> {
        let mut records = self.write();
        let Some(record) = records.get_mut(key) else {
            return Ok(None);
        };
        record.correct_scope(&scope);
        match entry {
            SetEntry::Perm(rule) => record.remove_perm(rule),
            SetEntry::Group(group) => record.remove_group(group),
        };
        Ok(Some(record.clone()))
    }

    fn data(&self) -> HashMap<String, Record> {
        self.read().clone()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
