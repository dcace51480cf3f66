//! Principal context and storage-key derivation.
//!
//! A [`PrincipalContext`] names who an operation is performed as (or, for
//! administrative mutations, against): an optional user, organization, and
//! group. Permission records are stored under string keys derived from the
//! context; deriving a key from an entirely empty context is an error.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator joining user and org in a membership key.
pub const MEMBERSHIP_SEPARATOR: char = '~';

/// Builds the membership-record key for a (user, org) pair.
pub fn membership_key(user: &str, org: &str) -> String {
    format!("{user}{MEMBERSHIP_SEPARATOR}{org}")
}

/// The (user, organization, group) tuple an operation is performed as or
/// against.
///
/// At least one member must be non-empty before any storage key can be
/// derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalContext {
    /// Acting (or target) user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Acting (or target) organization identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// Target group identifier. Not consulted during resolution (groups are
    /// discovered through the membership record); used to address group
    /// records in administrative mutations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl PrincipalContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for a user.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            user: Some(id.into()),
            ..Self::default()
        }
    }

    /// Creates a context for an organization.
    pub fn org(id: impl Into<String>) -> Self {
        Self {
            org: Some(id.into()),
            ..Self::default()
        }
    }

    /// Creates a context for a group.
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            group: Some(id.into()),
            ..Self::default()
        }
    }

    /// Sets the organization.
    pub fn with_org(mut self, id: impl Into<String>) -> Self {
        self.org = Some(id.into());
        self
    }

    /// Sets the group.
    pub fn with_group(mut self, id: impl Into<String>) -> Self {
        self.group = Some(id.into());
        self
    }

    /// Returns `true` if no member is set.
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.org.is_none() && self.group.is_none()
    }

    /// The storage key a mutation target resolves to.
    ///
    /// Precedence: group, then user, then org; a group record is always
    /// addressed directly, while rules for a user are stored under the user
    /// key regardless of the org the grant was made in (scoping to the org
    /// happens through pattern annotation, not through the key).
    pub fn storage_key(&self) -> Result<&str> {
        self.group
            .as_deref()
            .or(self.user.as_deref())
            .or(self.org.as_deref())
            .ok_or(Error::NoKeyInContext)
    }

    /// The membership-record key, present only when both user and org are
    /// set.
    pub fn membership_key(&self) -> Option<String> {
        match (self.user.as_deref(), self.org.as_deref()) {
            (Some(user), Some(org)) => Some(membership_key(user, org)),
            _ => None,
        }
    }

    /// A stable key identifying one resolution of this context, suitable for
    /// external caching: `user~org` when both are present, otherwise
    /// whichever single member is set.
    pub fn resolution_key(&self) -> Result<String> {
        match (self.user.as_deref(), self.org.as_deref()) {
            (Some(user), Some(org)) => Ok(membership_key(user, org)),
            (Some(user), None) => Ok(user.to_string()),
            (None, Some(org)) => Ok(org.to_string()),
            (None, None) => match self.group.as_deref() {
                Some(group) => Ok(group.to_string()),
                None => Err(Error::NoKeyInContext),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
