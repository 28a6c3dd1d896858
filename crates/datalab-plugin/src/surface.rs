//! Render surfaces and style state
//!
//! Renderers never read global style tables; the caller hands them a
//! [`StyleSnapshot`] of the defaults in force.

use datalab_schema::Scalar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Drawing surface renderers act on
pub trait Surface {
    /// Set a visual property
    fn set_property(&mut self, key: &str, value: Scalar);

    /// Remove a visual property
    fn clear_property(&mut self, key: &str);

    /// Current value of a visual property
    fn property(&self, key: &str) -> Option<&Scalar>;

    /// Switch the named style sheet
    fn set_style(&mut self, name: &str);

    /// Active style sheet
    fn style(&self) -> &str;

    /// Clear all properties and redraw from scratch
    fn reset(&mut self);
}

/// Default values of style properties at the time of rendering
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSnapshot {
    values: IndexMap<String, Scalar>,
}

impl StyleSnapshot {
    /// Empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Default for `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }

    /// Iterate defaults in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// In-memory surface recording properties, style and resets
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySurface {
    properties: IndexMap<String, Scalar>,
    style: String,
    resets: usize,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            style: "default".to_string(),
            resets: 0,
        }
    }
}

impl MemorySurface {
    /// Fresh surface using the `default` style
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the surface was reset
    #[inline]
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// Current properties in the order they were first set
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Surface for MemorySurface {
    fn set_property(&mut self, key: &str, value: Scalar) {
        self.properties.insert(key.to_string(), value);
    }

    fn clear_property(&mut self, key: &str) {
        self.properties.shift_remove(key);
    }

    fn property(&self, key: &str) -> Option<&Scalar> {
        self.properties.get(key)
    }

    fn set_style(&mut self, name: &str) {
        self.style = name.to_string();
    }

    fn style(&self) -> &str {
        &self.style
    }

    fn reset(&mut self) {
        self.properties.clear();
        self.resets += 1;
    }
}
