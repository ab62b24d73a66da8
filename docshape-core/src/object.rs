//! The generic, dynamically-typed document model.
//!
//! An [`Object`] is an insertion-ordered mapping from string keys to [`Value`]s.
//! Values are scalars, nested objects, or typed homogeneous arrays. Because each
//! array variant wraps a typed `Vec`, a heterogeneous array cannot be built at all.
//!
//! # Example
//!
//! ```ignore
//! use docshape_core::object::Object;
//!
//! let search = Object::new()
//!     .with("name", "Alice")
//!     .with("$limit", 10)
//!     .with("$orderBy", vec!["-age", "name"]);
//!
//! assert_eq!(search.get_str("name"), Some("Alice"));
//! ```

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Number;

use crate::error::{DocumentError, DocumentResult};

/// A single value held by an [`Object`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// Double-precision float.
    Double(f64),
    /// High-precision decimal, kept as its literal digits.
    Decimal(Number),
    /// Boolean.
    Boolean(bool),
    /// Timestamp with a fixed UTC offset.
    DateTime(DateTime<FixedOffset>),
    /// Nested object.
    Object(Object),
    /// Homogeneous array of strings.
    StringArray(Vec<String>),
    /// Homogeneous array of 32-bit integers.
    IntegerArray(Vec<i32>),
    /// Homogeneous array of doubles.
    DoubleArray(Vec<f64>),
    /// Homogeneous array of nested objects.
    ObjectArray(Vec<Object>),
    /// Explicit absence of a value.
    Null,
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl Value {
    /// Parses a decimal literal such as `"19.99"` into a [`Value::Decimal`].
    pub fn decimal(literal: &str) -> DocumentResult<Self> {
        Number::from_str(literal)
            .map(Value::Decimal)
            .map_err(|e| DocumentError::Conversion(format!("invalid decimal {literal:?}: {e}")))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::StringArray(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::StringArray(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i32>> for Value {
    fn from(value: Vec<i32>) -> Self {
        Value::IntegerArray(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::DoubleArray(value)
    }
}

impl From<Vec<Object>> for Value {
    fn from(value: Vec<Object>) -> Self {
        Value::ObjectArray(value)
    }
}

/// An insertion-ordered key/value document.
///
/// Cloning is deep: a clone shares no mutable state with the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Object {
    entries: IndexMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    /// Inserts a value, returning the previous value stored under `key`.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Fluent variant of [`Object::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Stores a decimal literal under `key`.
    pub fn set_decimal(&mut self, key: impl Into<String>, literal: &str) -> DocumentResult<()> {
        self.entries.insert(key.into(), Value::decimal(literal)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Removes a key while preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `true` when `key` is present and not [`Value::Null`].
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_integer(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a 64-bit integer, widening a stored 32-bit integer.
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Long(value) => Some(*value),
            Value::Integer(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_datetime(&self, key: &str) -> Option<&DateTime<FixedOffset>> {
        match self.get(key)? {
            Value::DateTime(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_object(&self, key: &str) -> Option<&Object> {
        match self.get(key)? {
            Value::Object(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string_array(&self, key: &str) -> Option<&[String]> {
        match self.get(key)? {
            Value::StringArray(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_integer_array(&self, key: &str) -> Option<&[i32]> {
        match self.get(key)? {
            Value::IntegerArray(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_double_array(&self, key: &str) -> Option<&[f64]> {
        match self.get(key)? {
            Value::DoubleArray(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_object_array(&self, key: &str) -> Option<&[Object]> {
        match self.get(key)? {
            Value::ObjectArray(value) => Some(value),
            _ => None,
        }
    }

    /// Renders this object as JSON. Datetimes become RFC 3339 strings.
    pub fn to_json(&self) -> DocumentResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
