//! Common test utilities and harness for Warden engine integration tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use warden_core::{Error, Record, Result, Rule, ScopeAnnotations};
use warden_engine::{AccessGate, EntityCanon, EntityStore, PermResolver};
use warden_store::{MemoryStore, PermStore, SetEntry};

/// Builds a record carrying only rules.
pub fn record_with_rules(rules: Vec<Rule>) -> Record {
    Record {
        perms: rules,
        ..Record::default()
    }
}

/// Builds a membership record carrying only groups.
pub fn record_with_groups(groups: Vec<&str>) -> Record {
    Record {
        groups: Some(groups.into_iter().map(String::from).collect()),
        ..Record::default()
    }
}

/// Builds a seeded memory store from (key, record) pairs.
pub fn seeded_store(records: Vec<(String, Record)>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_records(records.into_iter().collect()))
}

/// Converts a JSON object literal into an entity row.
pub fn row(value: Value) -> Map<String, Value> {
    let Value::Object(map) = value else {
        unreachable!("test rows are objects");
    };
    map
}

// ============================================================================
// ShuffledStore
// ============================================================================

/// Store wrapper delaying each fetch by a seed-dependent amount, so the
/// completion order of concurrent fetches varies from seed to seed while
/// the data stays fixed.
pub struct ShuffledStore {
    inner: Arc<MemoryStore>,
    seed: u64,
}

impl ShuffledStore {
    pub fn new(inner: Arc<MemoryStore>, seed: u64) -> Self {
        Self { inner, seed }
    }

    fn delay_for(&self, key: &str) -> Duration {
        let mut hasher = DefaultHasher::new();
        (key, self.seed).hash(&mut hasher);
        Duration::from_millis(hasher.finish() % 16)
    }
}

#[async_trait]
impl PermStore for ShuffledStore {
    async fn get(&self, key: &str) -> Result<Option<Record>> {
        tokio::time::sleep(self.delay_for(key)).await;
        self.inner.get(key).await
    }

    async fn set_add(
        &self,
        key: &str,
        entry: SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Record> {
        self.inner.set_add(key, entry, scope).await
    }

    async fn set_remove(
        &self,
        key: &str,
        entry: &SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Option<Record>> {
        self.inner.set_remove(key, entry, scope).await
    }

    fn data(&self) -> HashMap<String, Record> {
        self.inner.data()
    }

    fn name(&self) -> &str {
        "shuffled"
    }
}

// ============================================================================
// FlakyStore
// ============================================================================

/// Store wrapper failing every fetch of one key, after a delay, so error
/// propagation can be tested while other fetches are still in flight.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_key: String,
    delay: Duration,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>, failing_key: &str, delay: Duration) -> Self {
        Self {
            inner,
            failing_key: failing_key.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl PermStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Record>> {
        if key == self.failing_key {
            tokio::time::sleep(self.delay).await;
            return Err(Error::store(format!("fetch of '{key}' failed")));
        }
        self.inner.get(key).await
    }

    async fn set_add(
        &self,
        key: &str,
        entry: SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Record> {
        self.inner.set_add(key, entry, scope).await
    }

    async fn set_remove(
        &self,
        key: &str,
        entry: &SetEntry,
        scope: ScopeAnnotations,
    ) -> Result<Option<Record>> {
        self.inner.set_remove(key, entry, scope).await
    }

    fn data(&self) -> HashMap<String, Record> {
        self.inner.data()
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

// ============================================================================
// FixedEntities
// ============================================================================

/// Persistence collaborator backed by an in-memory row list. `list` returns
/// rows in insertion order; `load` matches on the `id` field.
#[derive(Default)]
pub struct FixedEntities {
    rows: RwLock<Vec<Map<String, Value>>>,
}

impl FixedEntities {
    pub fn seeded(rows: Vec<Value>) -> Self {
        Self {
            rows: RwLock::new(rows.into_iter().map(row).collect()),
        }
    }
}

#[async_trait]
impl EntityStore for FixedEntities {
    async fn save(
        &self,
        _canon: &EntityCanon,
        entity: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.iter_mut().find(|r| r.get("id") == entity.get("id")) {
            Some(existing) => *existing = entity.clone(),
            None => rows.push(entity.clone()),
        }
        Ok(entity)
    }

    async fn remove(&self, _canon: &EntityCanon, entity: Map<String, Value>) -> Result<()> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| r.get("id") != entity.get("id"));
        Ok(())
    }

    async fn load(&self, _canon: &EntityCanon, id: &Value) -> Result<Option<Map<String, Value>>> {
        Ok(self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.get("id") == Some(id))
            .cloned())
    }

    async fn list(
        &self,
        _canon: &EntityCanon,
        _query: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>> {
        Ok(self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Builds a gate over a seeded permission store and seeded entity rows.
pub fn gate_over(store: Arc<dyn PermStore>, rows: Vec<Value>) -> AccessGate {
    AccessGate::new(
        PermResolver::new(store),
        Arc::new(FixedEntities::seeded(rows)),
    )
}
