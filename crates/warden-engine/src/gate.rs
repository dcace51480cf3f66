//! The per-operation access gate.
//!
//! Every operation follows the same state machine: resolve the principal's
//! index, build the activity for the decision point, query the index, and
//! either delegate to the real collaborator or fail with a typed denial.
//! Write operations (save/remove) are checked against the input snapshot
//! before delegation; reads are delegated first and checked against what
//! came back; list results are filtered per item rather than denied
//! wholesale; generic messages are checked on the way in and, when their
//! shaper asks for it, on the way out.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use warden_core::{permits, Error, PrincipalContext, Result};
use warden_index::PermIndex;

use crate::activity::{
    entity_activity, EntityCanon, EntityCmd, Message, MessageCtx, MsgPhase, Shaper,
};
use crate::cache::{IndexCache, NoCache};
use crate::resolver::PermResolver;

/// External persistence collaborator.
///
/// Invoked only after (for writes) or before (for reads and lists) the
/// gate's decision; implementations perform the real storage work and know
/// nothing about permissions.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Creates or updates an entity, returning the stored snapshot.
    async fn save(
        &self,
        canon: &EntityCanon,
        entity: Map<String, Value>,
    ) -> Result<Map<String, Value>>;

    /// Deletes an entity. The full snapshot is supplied; id extraction is
    /// the collaborator's concern.
    async fn remove(&self, canon: &EntityCanon, entity: Map<String, Value>) -> Result<()>;

    /// Fetches one entity by id, or `None`.
    async fn load(&self, canon: &EntityCanon, id: &Value) -> Result<Option<Map<String, Value>>>;

    /// Lists entities matching a query.
    async fn list(
        &self,
        canon: &EntityCanon,
        query: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>>;
}

/// Delegate for a routed generic message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Performs the real work of the message and returns its result.
    async fn handle(&self, principal: &PrincipalContext, message: &Message) -> Result<Value>;
}

#[derive(Clone)]
struct Route {
    shaper: Shaper,
    handler: Arc<dyn MessageHandler>,
}

/// The access gate: one instance per deployment, shared across operations.
pub struct AccessGate {
    resolver: PermResolver,
    entities: Arc<dyn EntityStore>,
    routes: RwLock<HashMap<String, Route>>,
    cache: Arc<dyn IndexCache>,
}

impl AccessGate {
    /// Creates a gate over a resolver and a persistence collaborator, with
    /// no caching (every operation resolves cold).
    pub fn new(resolver: PermResolver, entities: Arc<dyn EntityStore>) -> Self {
        Self {
            resolver,
            entities,
            routes: RwLock::new(HashMap::new()),
            cache: Arc::new(NoCache),
        }
    }

    /// Plugs in an externally-owned resolution cache.
    pub fn with_cache(mut self, cache: Arc<dyn IndexCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The resolver this gate decides with.
    pub fn resolver(&self) -> &PermResolver {
        &self.resolver
    }

    /// The cache this gate consults; mutators use this to fire
    /// invalidation.
    pub fn cache(&self) -> Arc<dyn IndexCache> {
        Arc::clone(&self.cache)
    }

    /// Registers a shaper and handler for a message pattern. A later
    /// registration for the same pattern replaces the earlier one.
    pub fn register(
        &self,
        pattern: impl Into<String>,
        shaper: Shaper,
        handler: Arc<dyn MessageHandler>,
    ) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.into(), Route { shaper, handler });
    }

    /// Gated entity save: checked against the input snapshot, then
    /// delegated.
    pub async fn save(
        &self,
        principal: &PrincipalContext,
        canon: &EntityCanon,
        entity: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        self.check_write(principal, canon, &entity, EntityCmd::Save)
            .await?;
        self.entities.save(canon, entity).await
    }

    /// Gated entity remove: checked against the input snapshot, then
    /// delegated.
    pub async fn remove(
        &self,
        principal: &PrincipalContext,
        canon: &EntityCanon,
        entity: Map<String, Value>,
    ) -> Result<()> {
        self.check_write(principal, canon, &entity, EntityCmd::Remove)
            .await?;
        self.entities.remove(canon, entity).await
    }

    /// Gated entity load: delegated first (there is nothing to check until
    /// the snapshot exists), then checked against the returned snapshot. An
    /// absent entity passes through as `None`.
    pub async fn load(
        &self,
        principal: &PrincipalContext,
        canon: &EntityCanon,
        id: &Value,
    ) -> Result<Option<Map<String, Value>>> {
        require_user(principal)?;
        let index = self.resolve_index(principal).await?;

        let Some(entity) = self.entities.load(canon, id).await? else {
            return Ok(None);
        };

        let activity = entity_activity(EntityCmd::Load, &entity, canon, principal);
        if decided(&index, &activity) {
            Ok(Some(entity))
        } else {
            log::debug!("load denied: {activity}");
            Err(Error::NoReadAccess { activity })
        }
    }

    /// Gated entity list: delegated first, then filtered per item. Entities
    /// the principal may not see are omitted; relative order of the rest
    /// is preserved, and no per-item error is reported.
    pub async fn list(
        &self,
        principal: &PrincipalContext,
        canon: &EntityCanon,
        query: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>> {
        require_user(principal)?;
        let index = self.resolve_index(principal).await?;

        let entities = self.entities.list(canon, query).await?;
        let total = entities.len();
        let visible: Vec<Map<String, Value>> = entities
            .into_iter()
            .filter(|entity| {
                let activity = entity_activity(EntityCmd::List, entity, canon, principal);
                decided(&index, &activity)
            })
            .collect();

        if visible.len() < total {
            log::debug!("list filtered {} of {total} entities", total - visible.len());
        }
        Ok(visible)
    }

    /// Gated generic message: inbound check, delegate, outbound check.
    ///
    /// Either check is skipped when the registered shaper returns no
    /// activity for that phase.
    pub async fn dispatch(&self, principal: &PrincipalContext, message: Message) -> Result<Value> {
        require_user(principal)?;
        let route = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&message.pattern)
            .cloned()
            .ok_or_else(|| Error::NoRoute {
                pattern: message.pattern.clone(),
            })?;

        let index = self.resolve_index(principal).await?;

        let ctx = MessageCtx {
            message: &message,
            principal,
            result: None,
        };
        if let Some(activity) = (route.shaper)(&ctx, MsgPhase::In) {
            if !decided(&index, &activity) {
                log::debug!("inbound denied: {activity}");
                return Err(Error::NoInAccess { activity });
            }
        }

        let result = route.handler.handle(principal, &message).await?;

        let ctx = MessageCtx {
            message: &message,
            principal,
            result: Some(&result),
        };
        if let Some(activity) = (route.shaper)(&ctx, MsgPhase::Out) {
            if !decided(&index, &activity) {
                log::debug!("outbound denied: {activity}");
                return Err(Error::NoOutAccess { activity });
            }
        }

        Ok(result)
    }

    async fn check_write(
        &self,
        principal: &PrincipalContext,
        canon: &EntityCanon,
        entity: &Map<String, Value>,
        cmd: EntityCmd,
    ) -> Result<()> {
        require_user(principal)?;
        let index = self.resolve_index(principal).await?;

        let activity = entity_activity(cmd, entity, canon, principal);
        if decided(&index, &activity) {
            Ok(())
        } else {
            log::debug!("{cmd} denied: {activity}");
            Err(Error::NoWriteAccess { activity })
        }
    }

    async fn resolve_index(&self, principal: &PrincipalContext) -> Result<Arc<PermIndex>> {
        let key = principal.resolution_key()?;
        if let Some(index) = self.cache.get(&key) {
            return Ok(index);
        }
        let index = Arc::new(self.resolver.resolve(principal).await?);
        self.cache.put(&key, Arc::clone(&index));
        Ok(index)
    }
}

fn require_user(principal: &PrincipalContext) -> Result<()> {
    if principal.user.is_some() {
        Ok(())
    } else {
        Err(Error::NoUser)
    }
}

/// A missing match is a denial; a match still has to carry a permitting
/// decision value.
fn decided(index: &PermIndex, activity: &warden_core::Activity) -> bool {
    index.find(activity).is_some_and(permits)
}

// ============================================================================
// Tests
// ============================================================================
