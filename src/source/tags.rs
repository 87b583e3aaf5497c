//! Source-specific tag dictionary.
//!
//! Mirrors the shape of a DICOM dataset: attribute names map to scalars or to
//! sequences of nested datasets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Sequence(Vec<TagDictionary>),
}

impl TagValue {
    /// Numeric view of the value; text is parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Integer(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
            TagValue::Text(s) => s.trim().parse().ok(),
            TagValue::Sequence(_) => None,
        }
        .filter(|v: &f64| v.is_finite())
    }

    /// Integer view of the value. Floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TagValue::Integer(v) => Some(*v),
            TagValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            TagValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Integer(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl From<Vec<TagDictionary>> for TagValue {
    fn from(value: Vec<TagDictionary>) -> Self {
        TagValue::Sequence(value)
    }
}

/// Attribute name → value map, possibly nested through sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagDictionary(BTreeMap<String, TagValue>);

impl TagDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TagValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    /// First item of a sequence attribute.
    pub fn first_item(&self, key: &str) -> Option<&TagDictionary> {
        match self.0.get(key)? {
            TagValue::Sequence(items) => items.first(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
