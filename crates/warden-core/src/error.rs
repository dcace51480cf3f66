//! Error taxonomy for Warden.
//!
//! Access denials are first-class errors carrying the activity that was
//! refused, so callers and logs can see exactly which attribute set failed
//! to match. Each variant maps to a stable snake_case wire code via
//! [`Error::code`].

use crate::activity::Activity;

/// Convenience `Result` type alias for Warden operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving permissions or gating operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The principal is missing the acting user required for this operation.
    #[error("no acting user in principal context")]
    NoUser,

    /// The principal context yields no usable storage key.
    #[error("principal context yields no storage key")]
    NoKeyInContext,

    /// Write access (save/remove) was denied.
    #[error("no write access: {activity}")]
    NoWriteAccess {
        /// The activity that failed to match any permitting rule.
        activity: Activity,
    },

    /// Read access was denied for a loaded entity.
    #[error("no read access: {activity}")]
    NoReadAccess {
        /// The activity that failed to match any permitting rule.
        activity: Activity,
    },

    /// The inbound phase of a generic message was denied.
    #[error("no inbound access: {activity}")]
    NoInAccess {
        /// The activity that failed to match any permitting rule.
        activity: Activity,
    },

    /// The outbound phase of a generic message was denied.
    #[error("no outbound access: {activity}")]
    NoOutAccess {
        /// The activity that failed to match any permitting rule.
        activity: Activity,
    },

    /// A mutation request carried a malformed permission rule.
    #[error("invalid permission rule: {message}")]
    InvalidPerm {
        /// What was missing or malformed.
        message: String,
    },

    /// No handler is registered for a dispatched message pattern.
    #[error("no handler registered for message pattern '{pattern}'")]
    NoRoute {
        /// The pattern identity that failed to route.
        pattern: String,
    },

    /// Underlying permission store failure, propagated verbatim.
    #[error("store error: {message}")]
    Store {
        /// Human-readable description of the failure.
        message: String,
        /// Source error if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed message body or record payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new store error with a message.
    pub fn store<S: Into<String>>(message: S) -> Self {
        Error::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a message and source error.
    pub fn store_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid-rule error.
    pub fn invalid_perm<S: Into<String>>(message: S) -> Self {
        Error::InvalidPerm {
            message: message.into(),
        }
    }

    /// Returns whether this error is an access denial (as opposed to a
    /// resolution or store failure).
    ///
    /// Denials are an ordinary policy outcome; everything else indicates the
    /// decision could not be made at all.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Error::NoUser
                | Error::NoWriteAccess { .. }
                | Error::NoReadAccess { .. }
                | Error::NoInAccess { .. }
                | Error::NoOutAccess { .. }
        )
    }

    /// The stable snake_case wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoUser => "no_user",
            Error::NoKeyInContext => "no_key_in_context",
            Error::NoWriteAccess { .. } => "no_write_access",
            Error::NoReadAccess { .. } => "no_read_access",
            Error::NoInAccess { .. } => "no_in_access",
            Error::NoOutAccess { .. } => "no_out_access",
            Error::InvalidPerm { .. } => "invalid_perm",
            Error::NoRoute { .. } => "no_route",
            Error::Store { .. } => "store_error",
            Error::Serialization(_) => "invalid_msg",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
