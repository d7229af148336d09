//! Dynamically-typed data tree produced by executing package scripts.
//!
//! Script engines surface their nested tables as [`Value`]s. Every accessor
//! returns an `Option` instead of panicking, so extraction code can express
//! field fallbacks as ordinary option chains:
//!
//! ```rust,ignore
//! let results = entry.get("results").or_else(|| entry.get("result"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A node in the data tree.
///
/// Serialized untagged, so a snapshot of a tree reads naturally in JSON, RON
/// or TOML. There is no null: absent fields are simply missing from their
/// mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

/// The kind of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Sequence => "sequence",
            ValueKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

impl Value {
    /// An empty mapping.
    pub fn mapping() -> Self {
        Value::Mapping(BTreeMap::new())
    }

    /// Build a mapping from `(key, value)` pairs. Later pairs overwrite
    /// earlier ones with the same key.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Sequence(_) => ValueKind::Sequence,
            Value::Mapping(_) => ValueKind::Mapping,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a named field. `None` if absent or if `self` is not a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Look up a 1-based positional field.
    ///
    /// Sequences are indexed directly. Mappings are consulted under the
    /// decimal key, since an engine may surface a sparse integer-keyed table
    /// as a mapping.
    pub fn index(&self, position: usize) -> Option<&Value> {
        if position == 0 {
            return None;
        }
        match self {
            Value::Sequence(items) => items.get(position - 1),
            Value::Mapping(map) => map.get(&position.to_string()),
            _ => None,
        }
    }

    /// Follow a chain of named fields from `self`.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Child values of a sequence (in order) or mapping (in key order).
    /// Scalars have no children.
    pub fn entries(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Value::Sequence(items) => Box::new(items.iter()),
            Value::Mapping(map) => Box::new(map.values()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Set `value` at `path`, replacing any non-mapping node along the way
    /// with an empty mapping. An empty path replaces `self`.
    pub fn set_path(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            *self = value;
            return;
        };
        let mut node = self;
        for key in parents {
            node = node.ensure_mapping().entry((*key).to_string()).or_insert_with(Value::mapping);
        }
        node.ensure_mapping().insert((*last).to_string(), value);
    }

    fn ensure_mapping(&mut self) -> &mut BTreeMap<String, Value> {
        if !matches!(self, Value::Mapping(_)) {
            *self = Value::mapping();
        }
        match self {
            Value::Mapping(map) => map,
            _ => unreachable!("just replaced with a mapping"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
