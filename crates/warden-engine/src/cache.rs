//! Externally-owned resolution cache seam.
//!
//! The engine itself never requires a cache: with the default [`NoCache`]
//! every decision runs a full cold resolution, which is always correct.
//! Hosts that want to amortize resolution plug in an [`IndexCache`]; the
//! administrative mutators fire the invalidation hook on every successful
//! mutation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use warden_index::PermIndex;

/// Cache of built permission indexes, keyed by resolution key.
///
/// Implementations own their eviction policy. The engine promises only to
/// consult `get`/`put` around resolution and to call [`clear`](Self::clear)
/// whenever a mutation may have changed any principal's effective rules
/// (org and group records fan out across principals, so mutation
/// invalidation is coarse).
pub trait IndexCache: Send + Sync {
    /// Returns the cached index for a resolution key, if any.
    fn get(&self, key: &str) -> Option<Arc<PermIndex>>;

    /// Stores the index built for a resolution key.
    fn put(&self, key: &str, index: Arc<PermIndex>);

    /// Drops one resolution key.
    fn invalidate(&self, key: &str);

    /// Drops everything.
    fn clear(&self);
}

/// The default cache: nothing is retained and every resolution is cold.
#[derive(Debug, Default)]
pub struct NoCache;

impl IndexCache for NoCache {
    fn get(&self, _key: &str) -> Option<Arc<PermIndex>> {
        None
    }

    fn put(&self, _key: &str, _index: Arc<PermIndex>) {}

    fn invalidate(&self, _key: &str) {}

    fn clear(&self) {}
}

/// Simple unbounded in-memory cache.
///
/// Suitable for tests and single-process hosts; anything with real traffic
/// wants bounded or time-limited eviction on top.
#[derive(Debug, Default)]
pub struct MemoryIndexCache {
    entries: RwLock<HashMap<String, Arc<PermIndex>>>,
}

impl MemoryIndexCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexCache for MemoryIndexCache {
    fn get(&self, key: &str) -> Option<Arc<PermIndex>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, index: Arc<PermIndex>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), index);
    }

    fn invalidate(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
