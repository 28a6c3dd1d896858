//! Runtime values shaped by a schema
//!
//! [`ValueTree`] maps base names to [`Value`]s and keeps insertion order.
//! `null` in serialized form means "absent" and is dropped on load.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SchemaError;
use crate::spec::Primitive;

/// Single primitive value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
}

impl Scalar {
    /// Whether this is the empty string (treated as "no value")
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Text content, if this is text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as `f64`
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer value
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean value
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce to the given primitive
    ///
    /// Returns `None` when the value cannot represent the target type.
    /// Integers are strict: `2.5` is not an integer, `2.0` is.
    #[must_use]
    pub fn coerce(&self, to: Primitive) -> Option<Self> {
        match to {
            Primitive::String => Some(match self {
                Self::Text(s) => Self::Text(s.clone()),
                other => Self::Text(other.to_string()),
            }),
            Primitive::Float => match self {
                Self::Float(v) => Some(Self::Float(*v)),
                Self::Integer(_) => self.as_f64().map(Self::Float),
                Self::Text(s) => s.trim().parse::<f64>().ok().map(Self::Float),
                Self::Bool(_) => None,
            },
            Primitive::Integer => match self {
                Self::Integer(v) => Some(Self::Integer(*v)),
                Self::Float(v) => float_to_int(*v).map(Self::Integer),
                Self::Text(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
                        .map(Self::Integer)
                }
                Self::Bool(_) => None,
            },
            Primitive::Boolean => match self {
                Self::Bool(v) => Some(Self::Bool(*v)),
                Self::Integer(0) => Some(Self::Bool(false)),
                Self::Integer(1) => Some(Self::Bool(true)),
                Self::Integer(_) | Self::Float(_) => None,
                Self::Text(s) => parse_bool(s).map(Self::Bool),
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Parse a boolean from its common textual spellings
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "t" | "y" | "yes" | "on" | "true" | "1" => Some(true),
        "f" | "n" | "no" | "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Structural shape of a value, used in mismatch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Lone scalar
    Scalar,
    /// Sequence of scalars
    Sequence,
    /// Mapping (static group)
    Mapping,
    /// Sequence of mappings (repeatable group)
    Mappings,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scalar => "a single value",
            Self::Sequence => "a list of values",
            Self::Mapping => "a group",
            Self::Mappings => "a list of groups",
        })
    }
}

/// Value stored under one key of a [`ValueTree`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Lone scalar
    Scalar(Scalar),
    /// Sequence of scalars (multi-value field)
    Sequence(Vec<Scalar>),
    /// Static group
    Group(ValueTree),
    /// Repeatable group instances
    Groups(Vec<ValueTree>),
}

impl Value {
    /// Shape of this value
    #[inline]
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Scalar,
            Self::Sequence(_) => Shape::Sequence,
            Self::Group(_) => Shape::Mapping,
            Self::Groups(_) => Shape::Mappings,
        }
    }

    /// Whether this is a sequence with no elements
    ///
    /// An empty list carries no element type, so both sequence variants
    /// count.
    #[inline]
    #[must_use]
    pub fn is_empty_sequence(&self) -> bool {
        match self {
            Self::Sequence(items) => items.is_empty(),
            Self::Groups(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Scalar content
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(v: Vec<Scalar>) -> Self {
        Self::Sequence(v)
    }
}

impl From<ValueTree> for Value {
    fn from(v: ValueTree) -> Self {
        Self::Group(v)
    }
}

impl From<Vec<ValueTree>> for Value {
    fn from(v: Vec<ValueTree>) -> Self {
        Self::Groups(v)
    }
}

macro_rules! scalar_into_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Scalar(Scalar::from(v))
            }
        })*
    };
}

scalar_into_value!(bool, i64, f64, &str, String);

/// Ordered mapping from base name to value
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ValueTree {
    entries: IndexMap<String, Value>,
}

impl<'de> Deserialize<'de> for ValueTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Option<Value>>::deserialize(deserializer)?;
        Ok(Self {
            entries: raw
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        })
    }
}

impl ValueTree {
    /// Create an empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[inline]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Remove a value, keeping the order of the remaining entries
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    /// Value stored under `name`
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Whether `name` is present
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Scalar stored under `name`
    #[inline]
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(Value::as_scalar)
    }

    /// Non-empty text stored under `name`
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.scalar(name)
            .and_then(Scalar::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Number stored under `name`
    #[must_use]
    pub fn float(&self, name: &str) -> Option<f64> {
        self.scalar(name).and_then(Scalar::as_f64)
    }

    /// Integer stored under `name`
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.scalar(name).and_then(Scalar::as_i64)
    }

    /// Boolean stored under `name`
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.scalar(name).and_then(Scalar::as_bool)
    }

    /// Sequence of scalars stored under `name` (empty when absent)
    #[must_use]
    pub fn sequence(&self, name: &str) -> &[Scalar] {
        match self.get(name) {
            Some(Value::Sequence(items)) => items,
            _ => &[],
        }
    }

    /// Non-empty texts of the sequence stored under `name`
    #[must_use]
    pub fn strings(&self, name: &str) -> Vec<String> {
        self.sequence(name)
            .iter()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Static group stored under `name`
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ValueTree> {
        match self.get(name) {
            Some(Value::Group(tree)) => Some(tree),
            _ => None,
        }
    }

    /// Repeatable group instances stored under `name` (empty when absent)
    #[must_use]
    pub fn groups(&self, name: &str) -> &[ValueTree] {
        match self.get(name) {
            Some(Value::Groups(items)) => items,
            _ => &[],
        }
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or not an object
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(json).map_err(SchemaError::Json)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the YAML is malformed or not a mapping
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(yaml).map_err(SchemaError::Yaml)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns error if a float is not representable in JSON
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string_pretty(self).map_err(SchemaError::Json)
    }

    /// Convert to a JSON value
    ///
    /// # Errors
    /// Returns error if a float is not representable in JSON
    pub fn to_json_value(&self) -> Result<serde_json::Value, SchemaError> {
        serde_json::to_value(self).map_err(SchemaError::Json)
    }

    /// Build from a JSON value
    ///
    /// # Errors
    /// Returns error if the value is not an object of supported shapes
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value).map_err(SchemaError::Json)
    }
}

impl FromIterator<(String, Value)> for ValueTree {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_shapes_map_to_variants() {
        let tree = ValueTree::from_json(
            r#"{"a": 1, "b": 2.5, "c": "x", "d": true, "e": [1.0, 2.5],
                "f": {"g": "h"}, "i": [{"j": 1}], "k": null}"#,
        )
        .unwrap();

        assert_eq!(tree.get("a"), Some(&Value::Scalar(Scalar::Integer(1))));
        assert_eq!(tree.float("b"), Some(2.5));
        assert_eq!(tree.text("c"), Some("x"));
        assert_eq!(tree.boolean("d"), Some(true));
        assert_eq!(tree.sequence("e"), &[Scalar::Float(1.0), Scalar::Float(2.5)]);
        assert_eq!(tree.group("f").and_then(|g| g.text("g")), Some("h"));
        assert_eq!(tree.groups("i").len(), 1);
        assert!(!tree.contains("k"), "null means absent");
    }

    #[test]
    fn empty_array_is_empty_sequence() {
        let tree = ValueTree::from_json(r#"{"a": []}"#).unwrap();
        assert!(tree.get("a").is_some_and(Value::is_empty_sequence));
    }

    #[test]
    fn explicit_empty_string_survives_round_trip() {
        let tree = ValueTree::new().with("label", "");
        let json = tree.to_json().unwrap();
        let back = ValueTree::from_json(&json).unwrap();

        assert_eq!(back.scalar("label"), Some(&Scalar::Text(String::new())));
        assert_eq!(back.text("label"), None);
    }

    #[test]
    fn insertion_order_preserved() {
        let tree = ValueTree::new().with("z", 1_i64).with("a", 2_i64).with("m", 3_i64);
        let keys: Vec<_> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn coerce_text_to_numbers() {
        assert_eq!(
            Scalar::from(" 2.5 ").coerce(Primitive::Float),
            Some(Scalar::Float(2.5))
        );
        assert_eq!(Scalar::from("7").coerce(Primitive::Integer), Some(Scalar::Integer(7)));
        assert_eq!(Scalar::from("7.0").coerce(Primitive::Integer), Some(Scalar::Integer(7)));
        assert_eq!(Scalar::from("abc").coerce(Primitive::Float), None);
        assert_eq!(Scalar::Float(2.5).coerce(Primitive::Integer), None);
    }

    #[test]
    fn coerce_booleans() {
        for text in ["yes", "On", "TRUE", "1", "t"] {
            assert_eq!(Scalar::from(text).coerce(Primitive::Boolean), Some(Scalar::Bool(true)));
        }
        for text in ["no", "off", "False", "0", "f"] {
            assert_eq!(Scalar::from(text).coerce(Primitive::Boolean), Some(Scalar::Bool(false)));
        }
        assert_eq!(Scalar::from("maybe").coerce(Primitive::Boolean), None);
        assert_eq!(Scalar::Integer(1).coerce(Primitive::Boolean), Some(Scalar::Bool(true)));
    }

    #[test]
    fn anything_coerces_to_string() {
        assert_eq!(Scalar::Integer(3).coerce(Primitive::String), Some(Scalar::from("3")));
        assert_eq!(Scalar::Bool(true).coerce(Primitive::String), Some(Scalar::from("true")));
    }
}
