mod compare;
mod numeric;

#[cfg(test)]
mod tests;

pub use compare::{value_cmp, value_eq};
pub use numeric::as_f64;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

///
/// Value
///
/// The canonical in-memory document representation. Entities, patches,
/// where-clauses and query results are all `Value::Map`s under the hood;
/// schemas decode untyped JSON-shaped input into `Value` and validate it,
/// and encode `Value` back out for persistence.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Map(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    /// Looks up a single top-level key on a `Map` value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Dotted field-path accessor used throughout predicate evaluation,
    /// projection, and sorting (e.g. `"author.name"`).
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Sets (inserting or replacing) a top-level key on a `Map` value.
    /// No-op on non-map values.
    pub fn set(&mut self, key: &str, value: Value) {
        if let Self::Map(entries) = self {
            if let Some(entry) = entries.iter_mut().find(|(k, _)| k == key) {
                entry.1 = value;
            } else {
                entries.push((key.to_string(), value));
            }
        }
    }

    /// Removes a top-level key, returning its prior value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Self::Map(entries) => {
                let idx = entries.iter().position(|(k, _)| k == key)?;
                Some(entries.remove(idx).1)
            }
            _ => None,
        }
    }

    /// Merges `patch` onto `self` (shallow, top-level keys only), as used
    /// by `update`/`upsert`. Keys present in `patch` overwrite; all other
    /// keys of `self` are preserved.
    #[must_use]
    pub fn merged(&self, patch: &Value) -> Value {
        let Self::Map(base) = self else {
            return patch.clone();
        };
        let Self::Map(patch_entries) = patch else {
            return self.clone();
        };
        let mut merged = base.clone();
        for (k, v) in patch_entries {
            if let Some(entry) = merged.iter_mut().find(|(ek, _)| ek == k) {
                entry.1 = v.clone();
            } else {
                merged.push((k.clone(), v.clone()));
            }
        }
        Value::Map(merged)
    }

    #[must_use]
    pub fn string_fields(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
                .collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    #[must_use]
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Self::List(items) => Some(items.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(_) | Self::Map(_) => {
                let json = serde_json::to_string(&JsonBridge(self)).unwrap_or_default();
                write!(f, "{json}")
            }
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(value_cmp(self, other))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Bridges our hand-rolled `Value` to `serde_json::Value` for encode/decode
/// at persistence and schema boundaries, preserving map key order (ProseQL
/// maps are ordered; `serde_json::Map` with the `preserve_order` feature
/// would also work, but going through our own bridge keeps the dependency
/// surface predictable regardless of downstream feature unification).
struct JsonBridge<'a>(&'a Value);

impl serde::Serialize for JsonBridge<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        to_json(self.0).serialize(serializer)
    }
}

#[must_use]
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => {
            let mut map = serde_json::Map::new();
            for (k, v) in entries {
                map.insert(k.clone(), to_json(v));
            }
            serde_json::Value::Object(map)
        }
    }
}

#[must_use]
pub fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::Map(map.iter().map(|(k, v)| (k.clone(), from_json(v))).collect())
        }
    }
}
