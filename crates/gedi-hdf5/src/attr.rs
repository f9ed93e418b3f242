//! Attribute values and their JSON encoding.
//!
//! HDF5 attributes are dynamically typed. Downstream, every attribute value
//! becomes a JSON string in columnar field metadata, so we model values as a
//! closed union rather than open-ended runtime typing: anything a backend
//! cannot express in this union is rejected at read time.

use serde_json::Value;

/// A single attribute value read from a group or dataset.
///
/// Sequence-valued attributes (1-D attribute arrays) are represented as
/// [`AttrValue::List`]; they serialize to plain JSON lists.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Convert to a `serde_json::Value`.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Float(f) => Value::from(*f),
            AttrValue::Str(s) => Value::from(s.as_str()),
            AttrValue::List(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
        }
    }

    /// JSON-encode this value as a metadata string.
    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}
