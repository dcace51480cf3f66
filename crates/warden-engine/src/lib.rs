//! Warden Engine — resolution, activities, and the access gate.
//!
//! Provides:
//! - [`PermResolver`]: Hierarchy-aware fetch-and-merge of permission rules
//! - [`entity_activity`] / [`Shaper`]: Activity construction for entity
//!   operations and generic messages
//! - [`AccessGate`]: The per-operation state machine around delegated
//!   persistence and message handling
//! - [`Admin`] / [`register_admin_routes`]: Administrative mutators routed
//!   through the gate
//! - [`IndexCache`]: Externally-owned cache seam with mutation
//!   invalidation

#![doc = include_str!("../README.md")]

pub mod activity;
pub mod admin;
pub mod cache;
pub mod gate;
pub mod resolver;

pub use activity::{
    entity_activity, inbound_only, message_activity, EntityCanon, EntityCmd, Message, MessageCtx,
    MsgPhase, Shaper,
};
pub use admin::{register_admin_routes, Admin, AdminOp, GROUP_PATTERN, PERM_PATTERN};
pub use cache::{IndexCache, MemoryIndexCache, NoCache};
pub use gate::{AccessGate, EntityStore, MessageHandler};
pub use resolver::PermResolver;
