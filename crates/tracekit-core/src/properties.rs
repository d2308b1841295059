//! Event property values
//!
//! Custom event properties are a closed tagged-variant type rather than an
//! open "any" value: every supported shape is enumerated, serialization is
//! explicit, and JSON round-trips preserve the variant without runtime type
//! inspection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Map of property names to values, as attached to an event.
///
/// `BTreeMap` keeps key order deterministic on the wire and in persistence.
pub type Properties = BTreeMap<String, PropertyValue>;

// ----------------------------------------------------------------------------
// Property Value
// ----------------------------------------------------------------------------

/// A single event property value.
///
/// Serialized untagged, so `{"plan": "annual", "seats": 3}` deserializes to
/// `String` and `Int` variants directly. Variant order matters: integers are
/// tried before floats so whole numbers keep their integer identity through a
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Canonical string conversion used by the user state store.
    ///
    /// Scalars convert to their display form; arrays and maps have no
    /// canonical string form and return `None` (the store drops them).
    pub fn as_property_string(&self) -> Option<String> {
        match self {
            PropertyValue::Bool(b) => Some(b.to_string()),
            PropertyValue::Int(i) => Some(i.to_string()),
            PropertyValue::Float(f) => Some(f.to_string()),
            PropertyValue::String(s) => Some(s.clone()),
            PropertyValue::Array(_) | PropertyValue::Map(_) => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl<V: Into<PropertyValue>> From<Vec<V>> for PropertyValue {
    fn from(values: Vec<V>) -> Self {
        PropertyValue::Array(values.into_iter().map(Into::into).collect())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
