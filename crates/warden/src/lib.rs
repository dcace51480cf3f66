//! Warden access control engine — umbrella crate.
//!
//! This crate re-exports all Warden components for convenience.

#![doc = include_str!("../README.md")]

pub use warden_core as core;
pub use warden_engine as engine;
pub use warden_index as index;
pub use warden_store as store;
