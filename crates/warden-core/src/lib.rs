//! Warden Core — shared types, errors, and key derivation.
//!
//! This crate provides the foundational types used across all Warden crates.
//! It has no internal Warden dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`activity`]: Flat attribute sets describing one decision point
//! - [`context`]: Principal context and storage-key derivation
//! - [`error`]: Error taxonomy and Result alias
//! - [`rule`]: Permission rules, patterns, and stored records

#![doc = include_str!("../README.md")]

pub mod activity;
pub mod context;
pub mod error;
pub mod rule;

// Re-export key types at crate root for convenience
pub use activity::Activity;
pub use context::{membership_key, PrincipalContext};
pub use error::{Error, Result};
pub use rule::{permits, FieldMatch, Pattern, Record, Rule, ScopeAnnotations};
