//! Permission rules, patterns, and stored records.
//!
//! A [`Rule`] pairs a partial attribute [`Pattern`] with an arbitrary
//! decision value. Rules live in [`Record`]s, the unit stored per principal
//! key. The wire shapes match the stored form exactly: a rule is
//! `{"p": {...}, "v": ...}` and a record is
//! `{"perms": [...], "groups": [...], "usr$": ..., "org$": ..., "grp$": ...}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::Activity;

/// The wire encoding of a wildcard pattern field.
pub const WILDCARD: &str = "*";

/// Returns whether a matched decision value permits the activity.
///
/// Only `null` and `false` deny; every other value (including `0` and `""`)
/// is a grant payload. Decision values are deliberately not restricted to
/// booleans so richer policies (filters, redaction specs) can ride on the
/// same matcher.
pub fn permits(decision: &Value) -> bool {
    !matches!(decision, Value::Null | Value::Bool(false))
}

/// One field constraint inside a rule pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMatch {
    /// Matches any query value, including an absent field. A wildcard
    /// constraint is vacuous: it never fails and contributes nothing to
    /// specificity.
    Any,
    /// Matches iff the query value is structurally equal.
    Value(Value),
}

impl FieldMatch {
    /// Creates an exact-value constraint.
    ///
    /// The string `"*"` always means [`FieldMatch::Any`]; an exact match of
    /// a literal `"*"` is not expressible on the wire.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::from(value.into())
    }

    /// Returns `true` for the wildcard constraint.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, FieldMatch::Any)
    }

    /// Tests this constraint against a query value (`None` = field absent).
    pub fn matches(&self, query: Option<&Value>) -> bool {
        match self {
            FieldMatch::Any => true,
            FieldMatch::Value(want) => query.is_some_and(|got| got == want),
        }
    }
}

impl From<Value> for FieldMatch {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) if s == WILDCARD => FieldMatch::Any,
            other => FieldMatch::Value(other),
        }
    }
}

impl From<&str> for FieldMatch {
    fn from(value: &str) -> Self {
        Self::from(Value::from(value))
    }
}

impl From<bool> for FieldMatch {
    fn from(value: bool) -> Self {
        FieldMatch::Value(Value::Bool(value))
    }
}

impl Serialize for FieldMatch {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldMatch::Any => serializer.serialize_str(WILDCARD),
            FieldMatch::Value(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldMatch {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from(Value::deserialize(deserializer)?))
    }
}

/// A partial attribute constraint.
///
/// Fields not mentioned in the pattern are don't-care: the pattern
/// constrains only what it names. An empty pattern matches every activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(BTreeMap<String, FieldMatch>);

impl Pattern {
    /// Creates an empty (match-all) pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field constraint.
    pub fn with(mut self, field: impl Into<String>, constraint: impl Into<FieldMatch>) -> Self {
        self.0.insert(field.into(), constraint.into());
        self
    }

    /// Inserts or overwrites an exact-value constraint.
    ///
    /// Used when merging rules into a resolution to pin them to the scoping
    /// context (acting user and/or org), so a grant made inside one org
    /// cannot apply in another.
    pub fn annotate(&mut self, field: impl Into<String>, id: impl Into<String>) {
        self.0
            .insert(field.into(), FieldMatch::Value(Value::String(id.into())));
    }

    /// Returns the constraint for a field, if any.
    pub fn get(&self, field: &str) -> Option<&FieldMatch> {
        self.0.get(field)
    }

    /// Number of constrained fields (wildcards included).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty (match-all) pattern.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tests whether every constraint in this pattern holds for the query.
    pub fn matches(&self, query: &Activity) -> bool {
        self.0
            .iter()
            .all(|(field, constraint)| constraint.matches(query.get(field)))
    }

    /// The number of non-wildcard constraints. Higher is more specific.
    pub fn specificity(&self) -> usize {
        self.0.values().filter(|c| !c.is_wildcard()).count()
    }
}

impl<K: Into<String>, C: Into<FieldMatch>> FromIterator<(K, C)> for Pattern {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        )
    }
}

/// A pattern plus its decision value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// The attribute pattern this rule matches.
    #[serde(rename = "p")]
    pub pattern: Pattern,

    /// The decision payload. Typically boolean, but any value is allowed;
    /// see [`permits`].
    #[serde(rename = "v")]
    pub value: Value,
}

impl Rule {
    /// Creates a rule from a pattern and decision value.
    pub fn new(pattern: Pattern, value: impl Into<Value>) -> Self {
        Self {
            pattern,
            value: value.into(),
        }
    }
}

/// Scope annotations stored alongside a record, self-corrected on every
/// mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeAnnotations {
    /// User the record was last mutated for.
    #[serde(rename = "usr$", default, skip_serializing_if = "Option::is_none")]
    pub usr: Option<String>,

    /// Org the record was last mutated for.
    #[serde(rename = "org$", default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// Group the record was last mutated for.
    #[serde(rename = "grp$", default, skip_serializing_if = "Option::is_none")]
    pub grp: Option<String>,
}

impl ScopeAnnotations {
    /// Returns `true` if no annotation is set.
    pub fn is_empty(&self) -> bool {
        self.usr.is_none() && self.org.is_none() && self.grp.is_none()
    }
}

/// The stored unit per principal key: rules, group memberships, and scope
/// annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Permission rules attached to this key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub perms: Vec<Rule>,

    /// Group memberships (present only on membership records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,

    /// Scope annotations, self-corrected on every mutation.
    #[serde(flatten)]
    pub scope: ScopeAnnotations,
}

impl Record {
    /// Appends a rule unless a structurally equal one is already present.
    ///
    /// Returns `true` if the record changed.
    pub fn add_perm(&mut self, rule: Rule) -> bool {
        if self.perms.contains(&rule) {
            return false;
        }
        self.perms.push(rule);
        true
    }

    /// Removes the first structurally equal rule, if present.
    ///
    /// Returns `true` if the record changed. Removing an absent rule is a
    /// no-op.
    pub fn remove_perm(&mut self, rule: &Rule) -> bool {
        match self.perms.iter().position(|r| r == rule) {
            Some(index) => {
                self.perms.remove(index);
                true
            }
            None => false,
        }
    }

    /// Adds a group membership unless already present.
    pub fn add_group(&mut self, group: impl Into<String>) -> bool {
        let group = group.into();
        let groups = self.groups.get_or_insert_with(Vec::new);
        if groups.contains(&group) {
            return false;
        }
        groups.push(group);
        true
    }

    /// Removes a group membership, if present. A no-op when absent.
    pub fn remove_group(&mut self, group: &str) -> bool {
        match &mut self.groups {
            Some(groups) => match groups.iter().position(|g| g == group) {
                Some(index) => {
                    groups.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Overwrites scope annotations with whatever the mutation supplied.
    ///
    /// Absent members of `scope` leave the stored annotation untouched.
    pub fn correct_scope(&mut self, scope: &ScopeAnnotations) {
        if let Some(usr) = &scope.usr {
            self.scope.usr = Some(usr.clone());
        }
        if let Some(org) = &scope.org {
            self.scope.org = Some(org.clone());
        }
        if let Some(grp) = &scope.grp {
            self.scope.grp = Some(grp.clone());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
