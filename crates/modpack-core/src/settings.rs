//! Flattened default settings gathered during the settings pass.
//!
//! Packages declare settings in four raw categories. The snapshot keeps one
//! default value per setting name; the category is only used to check the
//! value's kind. When two categories declare the same name, the category
//! scanned last wins and the collision is recorded.

use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// Categories and values
// ---------------------------------------------------------------------------

/// A raw settings category, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingCategory {
    String,
    Bool,
    Int,
    Double,
}

impl SettingCategory {
    pub const ALL: [SettingCategory; 4] = [
        SettingCategory::String,
        SettingCategory::Bool,
        SettingCategory::Int,
        SettingCategory::Double,
    ];

    /// Key of this category under `data.raw`.
    pub fn raw_key(self) -> &'static str {
        match self {
            SettingCategory::String => "string-setting",
            SettingCategory::Bool => "bool-setting",
            SettingCategory::Int => "int-setting",
            SettingCategory::Double => "double-setting",
        }
    }

    /// Convert a declared default into this category's value type.
    fn coerce(self, value: &Value) -> Option<SettingValue> {
        match (self, value) {
            (SettingCategory::String, Value::String(s)) => Some(SettingValue::String(s.clone())),
            (SettingCategory::Bool, Value::Bool(b)) => Some(SettingValue::Bool(*b)),
            (SettingCategory::Int, Value::Number(n)) if n.fract() == 0.0 && n.is_finite() => {
                Some(SettingValue::Int(*n as i64))
            }
            (SettingCategory::Double, Value::Number(n)) => Some(SettingValue::Double(*n)),
            _ => None,
        }
    }
}

impl fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw_key())
    }
}

/// The default value of one setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl SettingValue {
    pub fn to_value(&self) -> Value {
        match self {
            SettingValue::String(s) => Value::String(s.clone()),
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Int(i) => Value::Number(*i as f64),
            SettingValue::Double(d) => Value::Number(*d),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::String(s) => write!(f, "{s:?}"),
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Double(d) => write!(f, "{d}"),
        }
    }
}

/// A declared setting that could not be flattened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingSkip {
    #[error("{category} entry '{key}' has no name")]
    MissingName { category: SettingCategory, key: String },

    #[error("{category} '{name}' has no default_value")]
    MissingDefault { category: SettingCategory, name: String },

    #[error("{category} '{name}' has a {found} default")]
    WrongKind {
        category: SettingCategory,
        name: String,
        found: crate::value::ValueKind,
    },
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Setting name to default value, read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    values: BTreeMap<String, SettingValue>,
    collisions: Vec<String>,
    skipped: Vec<SettingSkip>,
}

impl SettingsSnapshot {
    /// Flatten every declared setting under `raw` (the settings context's
    /// `data.raw`).
    pub fn from_raw(raw: &Value) -> Self {
        let mut snapshot = Self::default();
        let mut seen_in: BTreeMap<String, SettingCategory> = BTreeMap::new();

        for category in SettingCategory::ALL {
            let Some(entries) = raw.get(category.raw_key()).and_then(Value::as_mapping) else {
                continue;
            };
            for (key, entry) in entries {
                let Some(name) = entry.get("name").and_then(Value::as_str) else {
                    snapshot.skip(SettingSkip::MissingName {
                        category,
                        key: key.clone(),
                    });
                    continue;
                };
                let Some(default) = entry.get("default_value") else {
                    snapshot.skip(SettingSkip::MissingDefault {
                        category,
                        name: name.to_string(),
                    });
                    continue;
                };
                let Some(value) = category.coerce(default) else {
                    snapshot.skip(SettingSkip::WrongKind {
                        category,
                        name: name.to_string(),
                        found: default.kind(),
                    });
                    continue;
                };

                if let Some(previous) = seen_in.insert(name.to_string(), category)
                    && previous != category
                {
                    warn!(
                        setting = name,
                        %previous,
                        %category,
                        "setting declared in two categories; keeping the later one"
                    );
                    snapshot.collisions.push(name.to_string());
                }
                snapshot.values.insert(name.to_string(), value);
            }
        }

        snapshot
    }

    fn skip(&mut self, reason: SettingSkip) {
        warn!("skipping setting: {reason}");
        self.skipped.push(reason);
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names declared in more than one category.
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    pub fn skipped(&self) -> &[SettingSkip] {
        &self.skipped
    }

    /// The `settings` global handed to data scripts:
    /// `{ startup = { <name> = { value = <default> } } }`.
    pub fn to_value(&self) -> Value {
        let startup = Value::from_pairs(self.values.iter().map(|(name, value)| {
            (
                name.clone(),
                Value::from_pairs([("value", value.to_value())]),
            )
        }));
        Value::from_pairs([("startup", startup)])
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> Value {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn flattens_all_categories() {
        let snapshot = SettingsSnapshot::from_raw(&raw(json!({
            "string-setting": {"s": {"name": "s", "default_value": "hi"}},
            "bool-setting": {"b": {"name": "b", "default_value": true}},
            "int-setting": {"i": {"name": "i", "default_value": 4}},
            "double-setting": {"d": {"name": "d", "default_value": 0.5}},
        })));
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.get("s"), Some(&SettingValue::String("hi".to_string())));
        assert_eq!(snapshot.get("b"), Some(&SettingValue::Bool(true)));
        assert_eq!(snapshot.get("i"), Some(&SettingValue::Int(4)));
        assert_eq!(snapshot.get("d"), Some(&SettingValue::Double(0.5)));
        assert!(snapshot.collisions().is_empty());
        assert!(snapshot.skipped().is_empty());
    }

    #[test]
    fn name_field_is_the_key() {
        let snapshot = SettingsSnapshot::from_raw(&raw(json!({
            "bool-setting": {"entry-key": {"name": "real-name", "default_value": false}},
        })));
        assert!(snapshot.get("entry-key").is_none());
        assert_eq!(snapshot.get("real-name"), Some(&SettingValue::Bool(false)));
    }

    #[test]
    fn later_category_wins_and_collision_is_recorded() {
        let snapshot = SettingsSnapshot::from_raw(&raw(json!({
            "string-setting": {"x": {"name": "x", "default_value": "text"}},
            "double-setting": {"x": {"name": "x", "default_value": 2.5}},
        })));
        assert_eq!(snapshot.get("x"), Some(&SettingValue::Double(2.5)));
        assert_eq!(snapshot.collisions(), ["x".to_string()]);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let snapshot = SettingsSnapshot::from_raw(&raw(json!({
            "int-setting": {
                "nameless": {"default_value": 1},
                "no-default": {"name": "no-default"},
                "fraction": {"name": "fraction", "default_value": 1.5},
                "ok": {"name": "ok", "default_value": 3},
            },
        })));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("ok"), Some(&SettingValue::Int(3)));
        assert_eq!(snapshot.skipped().len(), 3);
        assert!(snapshot.skipped().iter().any(|s| matches!(
            s,
            SettingSkip::WrongKind { name, found: crate::value::ValueKind::Number, .. } if name == "fraction"
        )));
    }

    #[test]
    fn missing_categories_yield_empty_snapshot() {
        let snapshot = SettingsSnapshot::from_raw(&Value::mapping());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn to_value_matches_startup_layout() {
        let snapshot = SettingsSnapshot::from_raw(&raw(json!({
            "bool-setting": {"b": {"name": "b", "default_value": true}},
        })));
        let v = snapshot.to_value();
        assert_eq!(
            v.lookup(&["startup", "b", "value"]).and_then(Value::as_bool),
            Some(true)
        );
    }
}
