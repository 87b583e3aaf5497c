//! Flat, namespaced store of raw source tags.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::source::{TagDictionary, TagValue};

/// Scalar value kept for audit / display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// `namespace.key → value` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawTagStore {
    entries: BTreeMap<String, RawValue>,
}

impl RawTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, namespace: &str, key: &str, value: RawValue) {
        self.entries.insert(format!("{}.{}", namespace, key), value);
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&RawValue> {
        self.entries.get(&format!("{}.{}", namespace, key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flatten every scalar in `tags` into the store.
    ///
    /// Sequence items get indexed paths: `Outer[0].Inner`.
    pub fn extend_from_tags(&mut self, namespace: &str, tags: &TagDictionary) {
        self.flatten(namespace, "", tags);
    }

    fn flatten(&mut self, namespace: &str, prefix: &str, tags: &TagDictionary) {
        for (key, value) in tags.iter() {
            let path = format!("{}{}", prefix, key);
            match value {
                TagValue::Integer(v) => self.set(namespace, &path, RawValue::Integer(*v)),
                TagValue::Float(v) => self.set(namespace, &path, RawValue::Float(*v)),
                TagValue::Text(v) => self.set(namespace, &path, RawValue::Text(v.clone())),
                TagValue::Sequence(items) => {
                    for (i, item) in items.iter().enumerate() {
                        self.flatten(namespace, &format!("{}[{}].", path, i), item);
                    }
                }
            }
        }
    }
}
