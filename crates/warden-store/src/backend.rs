//! Permission store trait and factory.
//!
//! This module defines the `PermStore` trait that all storage backends must
//! satisfy, the typed mutation entries, and the configuration-driven
//! factory.
//!
//! # Backends
//!
//! - `MemoryStore`: in-memory reference backend, also the test double
//!
//! Production deployments put a real key/value service behind the same
//! trait; the engine only ever sees success or failure of individual calls
//! (timeouts and retries are the backend's concern).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use warden_core::{Record, Result, Rule, ScopeAnnotations};

use crate::memory::MemoryStore;

/// A single entry added to or removed from a record's sets.
///
/// The stored record keeps rules and group memberships as sets under
/// structural equality; mutations name the set through the entry type
/// rather than a stringly property name.
#[derive(Debug, Clone, PartialEq)]
pub enum SetEntry {
    /// A permission rule in the record's `perms` set.
    Perm(Rule),
    /// A group membership in the record's `groups` set.
    Group(String),
}

/// Abstract permission store.
///
/// # Contract
///
/// - `set_add` / `set_remove` are idempotent under structural equality and
///   self-correct the record's scope annotations on every call.
/// - Mutations are atomic per key; a reader never observes a record
///   mid-mutation. Backends hand out copies (or otherwise immutable views),
///   not aliases into live storage.
#[async_trait]
pub trait PermStore: Send + Sync {
    /// Fetches the record stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Record>>;

    /// Adds an entry to the record under `key`, creating the record if
    /// absent. Adding an entry that is already present is a no-op.
    ///
    /// Returns the updated record.
    async fn set_add(&self, key: &str, entry: SetEntry, scope: ScopeAnnotations)
        -> Result<Record>;

    /// Removes an entry from the record under `key`. Removing an absent
    /// entry, or from an absent record, is a no-op success.
    ///
    /// Returns the updated record if one exists.
    async fn set_remove(
        &self,
        key: &str,
        entry: &SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Option<Record>>;

    /// Synchronous snapshot of all records, for debugging and tests.
    fn data(&self) -> HashMap<String, Record>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Permission store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type. Currently only "memory".
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

/// Creates a permission store based on configuration.
///
/// Unknown backend names fall back to the memory backend with a warning
/// rather than failing startup.
pub async fn create_perm_store(config: &StoreConfig) -> Result<Arc<dyn PermStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => {
            log::warn!("unknown permission store backend '{other}', using memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
