//! Activity construction for entity operations and generic messages.
//!
//! Entity operations get a fixed projection: the snapshot's own fields plus
//! the control fields naming who acts and what they do. Generic messages
//! have no fixed shape, so each registered message pattern supplies its own
//! [`Shaper`]: a pure projection from message context to activity, looked
//! up by pattern identity at dispatch time. A shaper returning `None` for a
//! phase skips the check for that phase entirely.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use warden_core::activity::fields;
use warden_core::{Activity, PrincipalContext};

/// Entity operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCmd {
    /// Create or update an entity.
    Save,
    /// Delete an entity.
    Remove,
    /// Fetch a single entity.
    Load,
    /// Visibility check for one entity inside a list result.
    List,
}

impl EntityCmd {
    /// The wire/activity value for this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCmd::Save => "save",
            EntityCmd::Remove => "remove",
            EntityCmd::Load => "load",
            EntityCmd::List => "list",
        }
    }

    /// Returns `true` for commands checked against the input snapshot
    /// (before delegation) rather than the returned one.
    pub fn is_write(&self) -> bool {
        matches!(self, EntityCmd::Save | EntityCmd::Remove)
    }
}

impl fmt::Display for EntityCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical entity type descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCanon {
    /// Deployment zone, if the host partitions by zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Namespace base, if the host groups types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Entity type name.
    pub name: String,
}

impl EntityCanon {
    /// Creates a canon with just a type name.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the namespace base.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Sets the deployment zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

/// Projects an entity operation into a queryable activity.
///
/// The activity is the entity snapshot's own fields merged with the control
/// fields; control fields win on collision so a snapshot cannot spoof the
/// acting user or the operation kind.
pub fn entity_activity(
    cmd: EntityCmd,
    snapshot: &Map<String, Value>,
    canon: &EntityCanon,
    principal: &PrincipalContext,
) -> Activity {
    let mut activity: Activity = snapshot.clone().into();
    if let Some(user) = &principal.user {
        activity.set(fields::USER, user.as_str());
    }
    if let Some(org) = &principal.org {
        activity.set(fields::ORG, org.as_str());
    }
    if let Some(zone) = &canon.zone {
        activity.set(fields::ZONE, zone.as_str());
    }
    if let Some(base) = &canon.base {
        activity.set(fields::BASE, base.as_str());
    }
    activity.set(fields::NAME, canon.name.as_str());
    activity.set(fields::CMD, cmd.as_str());
    activity.set(fields::IS_ENTITY, true);
    activity
}

/// The two checkpoints of a generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgPhase {
    /// Before the handler runs: only the request is visible.
    In,
    /// After the handler runs: the result is visible too.
    Out,
}

/// A generic message delivered to the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Pattern identity used to route to a registered shaper and handler.
    pub pattern: String,

    /// Message body.
    pub body: Map<String, Value>,
}

impl Message {
    /// Creates a message.
    pub fn new(pattern: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            pattern: pattern.into(),
            body,
        }
    }
}

/// Everything a shaper can see when projecting a message into an activity.
pub struct MessageCtx<'a> {
    /// The dispatched message.
    pub message: &'a Message,

    /// The acting principal.
    pub principal: &'a PrincipalContext,

    /// The handler's result; present only in the [`MsgPhase::Out`] phase.
    pub result: Option<&'a Value>,
}

/// Per-pattern projection from message context to activity.
///
/// Registered alongside the message handler; must be pure. Returning `None`
/// skips the check for that phase (a message that only needs an outbound
/// check returns `None` for `In`, and vice versa).
pub type Shaper = Arc<dyn Fn(&MessageCtx<'_>, MsgPhase) -> Option<Activity> + Send + Sync>;

/// The baseline message projection: the message's body fields merged with
/// the acting user and org. Shapers typically start from this and add or
/// drop fields.
pub fn message_activity(ctx: &MessageCtx<'_>) -> Activity {
    let mut activity: Activity = ctx.message.body.clone().into();
    if let Some(user) = &ctx.principal.user {
        activity.set(fields::USER, user.as_str());
    }
    if let Some(org) = &ctx.principal.org {
        activity.set(fields::ORG, org.as_str());
    }
    activity
}

/// Builds a shaper that checks only the inbound phase with the given
/// projection; the outbound phase is skipped.
pub fn inbound_only(
    project: impl Fn(&MessageCtx<'_>) -> Activity + Send + Sync + 'static,
) -> Shaper {
    Arc::new(move |ctx, phase| match phase {
        MsgPhase::In => Some(project(ctx)),
        MsgPhase::Out => None,
    })
}

// ============================================================================
// Tests
// ============================================================================
