//! Dynamically typed span attributes.
//!
//! Instrumentation sends attribute values of any shape. `AttrValue` is the closed
//! set of shapes we keep, and `AttrMap` is the per-span container every
//! normalization stage mutates in place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::keys;
use super::logparser::is_json;

/// Suffix used when an incoming attribute collides with an existing key.
const CLASHING_SUFFIX: &str = "_clashing";

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// JSON rendering, used for display names and composite values.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Array(_) | AttrValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<JsonValue> for AttrValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => AttrValue::Null,
            JsonValue::Bool(b) => AttrValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => AttrValue::Str(s),
            JsonValue::Array(items) => {
                AttrValue::Array(items.into_iter().map(AttrValue::from).collect())
            }
            JsonValue::Object(map) => AttrValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, AttrValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Attribute container owned by a single span or event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrMap(BTreeMap<String, AttrValue>);

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    /// String value of `key`. Absent keys and non-string values are treated as unset.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(AttrValue::as_str)
    }

    /// Text rendering of `key`, empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.0.get(key).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only when `key` is not present yet.
    pub fn insert_if_absent(&mut self, key: &str, value: AttrValue) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_string(), value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    /// Insert `value` without ever overwriting an existing, different value.
    ///
    /// On collision the incoming value goes to `<key>_clashing`, then
    /// `<key>_clashing_2`, `<key>_clashing_3` and so on.
    pub fn set_clashing_keys(&mut self, key: &str, value: AttrValue) {
        match self.0.get(key) {
            None => {
                self.0.insert(key.to_string(), value);
                return;
            }
            Some(existing) if *existing == value => return,
            Some(_) => {}
        }

        let base = format!("{key}{CLASHING_SUFFIX}");
        let mut candidate = base.clone();
        let mut n = 1;
        loop {
            match self.0.get(&candidate) {
                None => {
                    self.0.insert(candidate, value);
                    return;
                }
                Some(existing) if *existing == value => return,
                Some(_) => {
                    n += 1;
                    candidate = format!("{base}_{n}");
                }
            }
        }
    }

    /// Hoist nested fields under `prefix`, recursively. Null leaves are dropped.
    ///
    /// Strings holding a JSON object are expanded too, so a second pass over
    /// the result finds nothing left to flatten.
    pub fn flatten(&mut self, nested: BTreeMap<String, AttrValue>, prefix: &str) {
        for (key, value) in nested {
            let full = format!("{prefix}{key}");
            match value {
                AttrValue::Null => {}
                AttrValue::Map(inner) => self.flatten(inner, &format!("{full}.")),
                AttrValue::Str(s) if !keys::VERBATIM_KEYS.contains(&full.as_str()) => {
                    match is_json(&s) {
                        Some(inner) => self.flatten(inner, &format!("{full}.")),
                        None => {
                            self.0.insert(full, AttrValue::Str(s));
                        }
                    }
                }
                value => {
                    self.0.insert(full, value);
                }
            }
        }
    }

    /// Keys in sorted order, detached from the map so entries can be rewritten.
    pub(crate) fn key_list(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl FromIterator<(String, AttrValue)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        AttrMap(iter.into_iter().collect())
    }
}

impl IntoIterator for AttrMap {
    type Item = (String, AttrValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_ignores_non_strings() {
        let mut attrs = AttrMap::new();
        attrs.insert("a", "x");
        attrs.insert("b", 1i64);
        assert_eq!(attrs.str("a"), Some("x"));
        assert_eq!(attrs.str("b"), None);
        assert_eq!(attrs.str("missing"), None);
    }

    #[test]
    fn test_text_renders_scalars() {
        let mut attrs = AttrMap::new();
        attrs.insert("int", 42i64);
        attrs.insert("float", 1.5);
        attrs.insert("bool", true);
        assert_eq!(attrs.text("int"), "42");
        assert_eq!(attrs.text("float"), "1.5");
        assert_eq!(attrs.text("bool"), "true");
        assert_eq!(attrs.text("missing"), "");
    }

    #[test]
    fn test_set_clashing_keys_keeps_both_values() {
        let mut attrs = AttrMap::new();
        attrs.insert("user", "alice");
        attrs.set_clashing_keys("user", "bob".into());
        attrs.set_clashing_keys("user", "carol".into());

        assert_eq!(attrs.str("user"), Some("alice"));
        assert_eq!(attrs.str("user_clashing"), Some("bob"));
        assert_eq!(attrs.str("user_clashing_2"), Some("carol"));
    }

    #[test]
    fn test_set_clashing_keys_equal_value_is_noop() {
        let mut attrs = AttrMap::new();
        attrs.insert("user", "alice");
        attrs.set_clashing_keys("user", "alice".into());
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_flatten_nested() {
        let value = AttrValue::from(json!({"a": {"b": 1}, "c": null, "d": "x"}));
        let AttrValue::Map(nested) = value else {
            panic!("expected map");
        };
        let mut attrs = AttrMap::new();
        attrs.flatten(nested, "x.");

        assert_eq!(attrs.get("x.a.b"), Some(&AttrValue::Int(1)));
        assert_eq!(attrs.str("x.d"), Some("x"));
        assert!(!attrs.has("x.c"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(AttrValue::from(json!(7)), AttrValue::Int(7));
        assert_eq!(AttrValue::from(json!(7.25)), AttrValue::Float(7.25));
        assert_eq!(AttrValue::from(json!(null)), AttrValue::Null);
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let attrs: AttrMap =
            serde_json::from_value(json!({"s": "v", "n": 3, "b": false, "m": {"k": 1}})).unwrap();
        assert_eq!(attrs.str("s"), Some("v"));
        assert_eq!(attrs.get("n"), Some(&AttrValue::Int(3)));
        assert_eq!(attrs.get("b"), Some(&AttrValue::Bool(false)));
        assert!(matches!(attrs.get("m"), Some(AttrValue::Map(_))));
    }
}
