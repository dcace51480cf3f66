//! Administrative mutators, routed through the gate.
//!
//! Rule and group-membership mutations are ordinary gated messages: the
//! same resolution and index decide whether the acting principal may
//! administer, so delegated administration needs no special-cased logic.
//! A principal's own rules bound what they can grant.
//!
//! Wire shapes:
//! - `{upon: "perm", op: "add"|"rem", tusr?, torg?, tgrp?, perm: {p, v}}`
//! - `{upon: "grp", op: "add"|"rem", tusr, torg, tgrp}`

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use warden_core::{Error, PrincipalContext, Result, Rule, ScopeAnnotations};
use warden_store::{PermStore, SetEntry};

use crate::activity::{message_activity, Message, MsgPhase, Shaper};
use crate::cache::IndexCache;
use crate::gate::{AccessGate, MessageHandler};

/// Pattern identity of rule mutations.
pub const PERM_PATTERN: &str = "perm";

/// Pattern identity of group-membership mutations.
pub const GROUP_PATTERN: &str = "grp";

/// Mutation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminOp {
    /// Idempotent set-add.
    Add,
    /// Idempotent set-remove.
    Rem,
}

impl AdminOp {
    fn as_str(&self) -> &'static str {
        match self {
            AdminOp::Add => "add",
            AdminOp::Rem => "rem",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PermMsg {
    op: AdminOp,
    #[serde(default)]
    tusr: Option<String>,
    #[serde(default)]
    torg: Option<String>,
    #[serde(default)]
    tgrp: Option<String>,
    #[serde(default)]
    perm: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GroupMsg {
    op: AdminOp,
    tusr: String,
    torg: String,
    tgrp: String,
}

/// Handler for `upon:perm` messages.
struct PermAdmin {
    store: Arc<dyn PermStore>,
    cache: Arc<dyn IndexCache>,
}

#[async_trait]
impl MessageHandler for PermAdmin {
    async fn handle(&self, _principal: &PrincipalContext, message: &Message) -> Result<Value> {
        let msg: PermMsg = serde_json::from_value(Value::Object(message.body.clone()))?;
        let rule = validate_rule(msg.perm.as_ref())?;

        let target = PrincipalContext {
            user: msg.tusr,
            org: msg.torg,
            group: msg.tgrp,
        };
        let key = target.storage_key()?.to_string();
        let scope = scope_of(&target);

        let record = match msg.op {
            AdminOp::Add => Some(
                self.store
                    .set_add(&key, SetEntry::Perm(rule), scope)
                    .await?,
            ),
            AdminOp::Rem => {
                self.store
                    .set_remove(&key, &SetEntry::Perm(rule), scope)
                    .await?
            }
        };

        self.cache.clear();
        log::info!("perm {} on '{key}'", msg.op.as_str());
        Ok(record.map_or(Value::Null, |record| {
            serde_json::to_value(record).unwrap_or(Value::Null)
        }))
    }
}

/// Handler for `upon:grp` messages.
struct GroupAdmin {
    store: Arc<dyn PermStore>,
    cache: Arc<dyn IndexCache>,
}

#[async_trait]
impl MessageHandler for GroupAdmin {
    async fn handle(&self, _principal: &PrincipalContext, message: &Message) -> Result<Value> {
        let msg: GroupMsg = serde_json::from_value(Value::Object(message.body.clone()))?;
        let key = warden_core::membership_key(&msg.tusr, &msg.torg);
        let scope = ScopeAnnotations {
            usr: Some(msg.tusr),
            org: Some(msg.torg),
            grp: Some(msg.tgrp.clone()),
        };

        let record = match msg.op {
            AdminOp::Add => Some(
                self.store
                    .set_add(&key, SetEntry::Group(msg.tgrp), scope)
                    .await?,
            ),
            AdminOp::Rem => {
                self.store
                    .set_remove(&key, &SetEntry::Group(msg.tgrp), scope)
                    .await?
            }
        };

        self.cache.clear();
        log::info!("grp {} on '{key}'", msg.op.as_str());
        Ok(record.map_or(Value::Null, |record| {
            serde_json::to_value(record).unwrap_or(Value::Null)
        }))
    }
}

/// Checks the raw `perm` payload before it reaches the store: it must be an
/// object carrying a `p` object and a `v` value.
fn validate_rule(perm: Option<&Value>) -> Result<Rule> {
    let Some(perm) = perm else {
        return Err(Error::invalid_perm("missing perm"));
    };
    let Some(obj) = perm.as_object() else {
        return Err(Error::invalid_perm("perm is not an object"));
    };
    if !obj.get("p").is_some_and(Value::is_object) {
        return Err(Error::invalid_perm("missing pattern"));
    }
    if !obj.contains_key("v") {
        return Err(Error::invalid_perm("missing value"));
    }
    Ok(serde_json::from_value(perm.clone())?)
}

fn scope_of(target: &PrincipalContext) -> ScopeAnnotations {
    ScopeAnnotations {
        usr: target.user.clone(),
        org: target.org.clone(),
        grp: target.group.clone(),
    }
}

/// The shaper both admin routes share: the inbound activity is the message
/// body (op and target fields) plus the acting principal, so ordinary rules
/// can constrain who may administer what. No outbound check.
fn admin_shaper(upon: &'static str) -> Shaper {
    Arc::new(move |ctx, phase| match phase {
        MsgPhase::In => {
            let mut activity = message_activity(ctx);
            activity.set("upon", upon);
            Some(activity)
        }
        MsgPhase::Out => None,
    })
}

/// Registers the `perm` and `grp` admin routes on a gate.
///
/// The mutators write through `store` and clear the gate's cache on every
/// successful mutation.
pub fn register_admin_routes(gate: &AccessGate, store: Arc<dyn PermStore>) {
    let cache = gate.cache();
    gate.register(
        PERM_PATTERN,
        admin_shaper(PERM_PATTERN),
        Arc::new(PermAdmin {
            store: Arc::clone(&store),
            cache: Arc::clone(&cache),
        }),
    );
    gate.register(
        GROUP_PATTERN,
        admin_shaper(GROUP_PATTERN),
        Arc::new(GroupAdmin { store, cache }),
    );
}

/// Typed convenience wrapper building admin messages and dispatching them
/// through a gate.
pub struct Admin<'a> {
    gate: &'a AccessGate,
}

impl<'a> Admin<'a> {
    /// Wraps a gate whose admin routes are registered.
    pub fn new(gate: &'a AccessGate) -> Self {
        Self { gate }
    }

    /// Grants a rule to the target (user, org, or group).
    pub async fn add_rule(
        &self,
        principal: &PrincipalContext,
        target: &PrincipalContext,
        rule: &Rule,
    ) -> Result<Value> {
        self.rule_op(principal, target, rule, AdminOp::Add).await
    }

    /// Revokes a rule from the target. Removing an absent rule is a no-op
    /// success.
    pub async fn remove_rule(
        &self,
        principal: &PrincipalContext,
        target: &PrincipalContext,
        rule: &Rule,
    ) -> Result<Value> {
        self.rule_op(principal, target, rule, AdminOp::Rem).await
    }

    /// Adds a group to a user's membership within an org.
    pub async fn add_group_membership(
        &self,
        principal: &PrincipalContext,
        user: &str,
        org: &str,
        group: &str,
    ) -> Result<Value> {
        self.group_op(principal, user, org, group, AdminOp::Add)
            .await
    }

    /// Removes a group from a user's membership within an org. A no-op
    /// success when absent.
    pub async fn remove_group_membership(
        &self,
        principal: &PrincipalContext,
        user: &str,
        org: &str,
        group: &str,
    ) -> Result<Value> {
        self.group_op(principal, user, org, group, AdminOp::Rem)
            .await
    }

    async fn rule_op(
        &self,
        principal: &PrincipalContext,
        target: &PrincipalContext,
        rule: &Rule,
        op: AdminOp,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("op".into(), Value::String(op.as_str().into()));
        if let Some(user) = &target.user {
            body.insert("tusr".into(), Value::String(user.clone()));
        }
        if let Some(org) = &target.org {
            body.insert("torg".into(), Value::String(org.clone()));
        }
        if let Some(group) = &target.group {
            body.insert("tgrp".into(), Value::String(group.clone()));
        }
        body.insert("perm".into(), serde_json::to_value(rule)?);
        self.gate
            .dispatch(principal, Message::new(PERM_PATTERN, body))
            .await
    }

    async fn group_op(
        &self,
        principal: &PrincipalContext,
        user: &str,
        org: &str,
        group: &str,
        op: AdminOp,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("op".into(), Value::String(op.as_str().into()));
        body.insert("tusr".into(), Value::String(user.into()));
        body.insert("torg".into(), Value::String(org.into()));
        body.insert("tgrp".into(), Value::String(group.into()));
        self.gate
            .dispatch(principal, Message::new(GROUP_PATTERN, body))
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
