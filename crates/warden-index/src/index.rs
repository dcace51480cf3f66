//! Most-specific-match selection over a rule list.

use serde_json::Value;
use warden_core::{Activity, Rule};

/// An immutable index over a list of permission rules.
///
/// # Matching
///
/// A rule matches a query iff every field its pattern names is satisfied:
/// exact constraints require structural equality with the query value, and
/// wildcard constraints always hold (even when the field is absent from the
/// query). Fields the pattern does not name are don't-care.
///
/// # Selection
///
/// Among matching rules, the one with the most non-wildcard constraints
/// wins. Ties on that count go to the rule added latest, so merge order is
/// an override order: a narrowly-scoped rule appended after a broad
/// deny-all beats it for the requests it matches, and two equally specific
/// rules resolve in favor of the later grant.
#[derive(Debug, Clone, Default)]
pub struct PermIndex {
    entries: Vec<Rule>,
}

impl PermIndex {
    /// Builds an index from rules in merge order.
    pub fn build(rules: Vec<Rule>) -> Self {
        Self { entries: rules }
    }

    /// Returns the decision value of the most specific matching rule, or
    /// `None` when nothing matches.
    ///
    /// Callers treat `None` as a denial; a matched value still has to pass
    /// [`warden_core::permits`] to grant access.
    pub fn find(&self, query: &Activity) -> Option<&Value> {
        let mut best: Option<(usize, &Value)> = None;
        for rule in &self.entries {
            if !rule.pattern.matches(query) {
                continue;
            }
            let specificity = rule.pattern.specificity();
            match best {
                Some((current, _)) if specificity < current => {}
                _ => best = Some((specificity, &rule.value)),
            }
        }
        best.map(|(_, value)| value)
    }

    /// Number of rules in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index holds no rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the indexed rules in merge order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.entries.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
