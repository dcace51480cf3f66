//! Flat attribute sets describing one decision point.
//!
//! An [`Activity`] is the queryable projection of an in-flight operation:
//! the subject's own data fields merged with control fields describing who
//! is acting and what they are doing. Permission rule patterns are matched
//! against activities, so the control field names here are also the field
//! names rule authors (and scope annotation) use.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control attribute names shared between rule annotations and activity
/// builders.
pub mod fields {
    /// Acting user identifier.
    pub const USER: &str = "usr";
    /// Acting organization identifier.
    pub const ORG: &str = "org";
    /// Entity type zone.
    pub const ZONE: &str = "zone";
    /// Entity type base.
    pub const BASE: &str = "base";
    /// Entity type name.
    pub const NAME: &str = "name";
    /// Operation kind: "save", "remove", "load", or "list".
    pub const CMD: &str = "cmd";
    /// Marker distinguishing entity operations from generic messages.
    pub const IS_ENTITY: &str = "isEntity";
}

/// A flat attribute map characterizing one access decision.
///
/// Keys are ordered so the rendered form (used in denial errors and logs)
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Activity(BTreeMap<String, Value>);

impl Activity {
    /// Creates an empty activity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any existing value for the field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the value of an attribute, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns `true` if the attribute is present.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the activity has no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over attributes in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Activity {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Map<String, Value>> for Activity {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        write!(f, "{rendered}")
    }
}

// ============================================================================
// Tests
// ============================================================================
