//! Warden Store — the permission store seam.
//!
//! Provides:
//! - [`PermStore`]: Trait for async keyed record storage (implement per backend)
//! - [`SetEntry`]: Typed entries for set-add / set-remove mutations
//! - [`StoreConfig`] / [`create_perm_store`]: Configuration and backend factory
//! - [`MemoryStore`]: In-memory reference backend

#![doc = include_str!("../README.md")]

pub mod backend;
pub mod memory;

pub use backend::{create_perm_store, PermStore, SetEntry, StoreConfig};
pub use memory::MemoryStore;
