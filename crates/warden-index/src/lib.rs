//! Warden Index — the specificity-ordered pattern index.
//!
//! Provides [`PermIndex`], the decision structure at the heart of the
//! engine: build it from a merged rule list, query it with an activity, get
//! back the most specific matching decision value.
//!
//! Build is pure and synchronous; an index is immutable once built and is
//! created fresh for every resolution (never shared across concurrent
//! resolutions).

#![doc = include_str!("../README.md")]

pub mod index;
mod proptests;

pub use index::PermIndex;
