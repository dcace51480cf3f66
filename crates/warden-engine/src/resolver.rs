//! Hierarchy-aware permission resolution.
//!
//! A resolution fetches every rule source that applies to a principal:
//! the user record, the org record, the (user, org) membership record, and
//! one record per group the membership lists. The rules are merged in a
//! deterministic order, each pinned to its scoping context, and the result
//! is compiled into a fresh [`PermIndex`].
//!
//! The membership fetch makes the fan-out dynamic: how many group fetches
//! exist is unknown until it completes. The join here is two-phase rather
//! than counted. Phase 1 drains the three fixed fetches, which closes the
//! task set; phase 2 then issues and drains the group fetches, so
//! completion can never be signalled while undiscovered fetches remain.

use std::sync::Arc;

use futures::future::join_all;

use warden_core::activity::fields;
use warden_core::{Error, PrincipalContext, Record, Result, Rule};
use warden_index::PermIndex;
use warden_store::PermStore;

/// Resolves principals to freshly built permission indexes.
#[derive(Clone)]
pub struct PermResolver {
    store: Arc<dyn PermStore>,
}

impl PermResolver {
    /// Creates a resolver over a permission store.
    pub fn new(store: Arc<dyn PermStore>) -> Self {
        Self { store }
    }

    /// The underlying permission store.
    pub fn store(&self) -> &Arc<dyn PermStore> {
        &self.store
    }

    /// Fetches, merges, and compiles the rules applying to `context`.
    ///
    /// Merge order is user rules, then org rules, then each group's rules
    /// in membership-list order; later sources override earlier ones on
    /// specificity ties, regardless of which fetch completed first. Missing
    /// records contribute zero rules; any fetch failure fails the whole
    /// resolution, but only after every issued fetch has drained.
    pub async fn resolve(&self, context: &PrincipalContext) -> Result<PermIndex> {
        if context.user.is_none() && context.org.is_none() {
            return Err(Error::NoKeyInContext);
        }

        // Phase 1: the fixed sources race; all three are drained before any
        // error is inspected, so a failed fetch never strands the others.
        let membership = context.membership_key();
        let (user_rec, org_rec, member_rec) = tokio::join!(
            self.fetch(context.user.as_deref()),
            self.fetch(context.org.as_deref()),
            self.fetch(membership.as_deref()),
        );
        let user_rec = user_rec?;
        let org_rec = org_rec?;
        let member_rec = member_rec?;

        // Phase 2: the task set is closed (membership resolved) before the
        // group fetches are issued; join_all drains every one of them even
        // when some fail.
        let groups: Vec<String> = member_rec
            .and_then(|record| record.groups)
            .unwrap_or_default();
        if !groups.is_empty() {
            log::debug!("fetching {} group record(s) for membership", groups.len());
        }
        let group_results = join_all(groups.iter().map(|group| self.store.get(group))).await;
        let mut group_recs: Vec<Option<Record>> = Vec::with_capacity(group_results.len());
        for result in group_results {
            group_recs.push(result?);
        }

        let mut merged: Vec<Rule> = Vec::new();
        if let Some(record) = user_rec {
            merged.extend(annotated(record.perms, context.user.as_deref(), None));
        }
        if let Some(record) = org_rec {
            merged.extend(annotated(record.perms, None, context.org.as_deref()));
        }
        for record in group_recs.into_iter().flatten() {
            merged.extend(annotated(
                record.perms,
                context.user.as_deref(),
                context.org.as_deref(),
            ));
        }

        log::debug!("resolved {} rule(s) for principal", merged.len());
        Ok(PermIndex::build(merged))
    }

    async fn fetch(&self, key: Option<&str>) -> Result<Option<Record>> {
        match key {
            Some(key) => self.store.get(key).await,
            None => Ok(None),
        }
    }
}

/// Pins each rule to its scoping context by overwriting the acting-user
/// and/or acting-org pattern fields, so a grant made inside one org cannot
/// match activities in another.
fn annotated(rules: Vec<Rule>, usr: Option<&str>, org: Option<&str>) -> Vec<Rule> {
    rules
        .into_iter()
        .map(|mut rule| {
            if let Some(usr) = usr {
                rule.pattern.annotate(fields::USER, usr);
            }
            if let Some(org) = org {
                rule.pattern.annotate(fields::ORG, org);
            }
            rule
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
