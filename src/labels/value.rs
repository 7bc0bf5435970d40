use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A label value as written in the scrape configuration.
///
/// Loki itself only indexes string values, but the rule table accepts any
/// JSON-compatible value and forwards it untouched. Equality is structural,
/// which is what the batch merger relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<LabelValue>),
    Map(BTreeMap<String, LabelValue>),
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::String(value.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(value: String) -> Self {
        LabelValue::String(value)
    }
}

impl From<bool> for LabelValue {
    fn from(value: bool) -> Self {
        LabelValue::Bool(value)
    }
}

impl From<i64> for LabelValue {
    fn from(value: i64) -> Self {
        LabelValue::Number(value.into())
    }
}

/// Label name to value mapping attached to a stream.
///
/// Backed by a `BTreeMap`, so two sets compare equal regardless of the order
/// their keys were inserted in, and they serialise deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, LabelValue>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<LabelValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&LabelValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LabelValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, LabelValue)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (String, LabelValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for LabelSet {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), LabelValue::from(v)))
            .collect()
    }
}
