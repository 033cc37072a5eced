//! Parameter bags passed to the token endpoint.
//!
//! Keys coming from configuration can carry stray whitespace (`" scope "`),
//! so every key is brought into one canonical form before the bag reaches
//! an exchanger. The canonical form of a key is its trimmed spelling with
//! the case kept: OAuth parameter names are case sensitive. Header names
//! are matched case insensitively by HTTP itself. Normalization is deep:
//! nested mappings, including mappings inside arrays, are normalized the
//! same way as the top level.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ordered, string-keyed tree of request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Creates an empty parameter bag.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Inserts a parameter, returning the previous value under that key.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the parameter under `key` if it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns a copy of the bag with every key, at every depth, in
    /// canonical form. When two keys collapse onto the same canonical key
    /// the one that comes later wins.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self(normalize_map(self.0.clone()))
    }

    /// Merges `overrides` into the bag. Values from `overrides` win on
    /// key collision.
    #[must_use]
    pub fn merge(mut self, overrides: Params) -> Self {
        for (key, value) in overrides.0 {
            self.0.insert(key, value);
        }
        self
    }

    /// Flattens the bag into form fields. Scalars are rendered as text,
    /// nested values as JSON and nulls are skipped.
    #[must_use]
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
                };
                Some((key.clone(), value))
            })
            .collect()
    }

    /// Returns the string entries of the nested mapping under `key`.
    /// Used for options such as `headers`.
    pub fn string_map(&self, key: &str) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .get(key)
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|map| map.iter())
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Returns the canonical spelling of a parameter key.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_string()
}

/// Recursively normalizes every mapping key inside `value`.
#[must_use]
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        scalar => scalar,
    }
}

fn normalize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (normalize_key(&key), normalize_keys(value)))
        .collect()
}
