//! Column-oriented numeric table
//!
//! The value mutators transform and transformers load and persist. Columns
//! keep insertion order and always share one row count.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PluginError, PluginResult};

/// Named numeric columns of equal length
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Table {
    columns: IndexMap<String, Vec<f64>>,
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let columns = IndexMap::<String, Vec<f64>>::deserialize(deserializer)?;
        Self::from_columns(columns).map_err(serde::de::Error::custom)
    }
}

impl Table {
    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, values)` pairs
    ///
    /// # Errors
    /// Returns [`PluginError::LengthMismatch`] if columns differ in length
    pub fn from_columns<I, S>(columns: I) -> PluginResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    /// Insert or replace a column
    ///
    /// # Errors
    /// Returns [`PluginError::LengthMismatch`] if the length differs from
    /// the other columns
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> PluginResult<()> {
        let name = name.into();
        let others = self.columns.iter().find(|(k, _)| **k != name).map(|(_, v)| v.len());
        if let Some(expected) = others {
            if values.len() != expected {
                return Err(PluginError::LengthMismatch {
                    name,
                    expected,
                    actual: values.len(),
                });
            }
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Builder-style [`insert_column`](Self::insert_column)
    ///
    /// # Errors
    /// Returns [`PluginError::LengthMismatch`] on a length mismatch
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> PluginResult<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Remove a column, keeping the order of the rest
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<f64>> {
        self.columns.shift_remove(name)
    }

    /// Values of a column
    #[inline]
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Values of a column, or [`PluginError::MissingColumn`]
    ///
    /// # Errors
    /// Returns error if the column does not exist
    pub fn require(&self, name: &str) -> PluginResult<&[f64]> {
        self.column(name)
            .ok_or_else(|| PluginError::MissingColumn(name.to_string()))
    }

    /// Mutable values of a column; the length cannot change through this
    pub fn column_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        self.columns.get_mut(name).map(Vec::as_mut_slice)
    }

    /// Whether a column exists
    #[inline]
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no columns
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate columns in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Reorder every column by a row permutation
    ///
    /// `order[i]` is the source row of output row `i`.
    ///
    /// # Errors
    /// Returns error if `order` is not a permutation of the rows
    pub fn permute_rows(&mut self, order: &[usize]) -> PluginResult<()> {
        let rows = self.row_count();
        let mut seen = vec![false; rows];
        for &i in order {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(PluginError::failed("row order is not a permutation")),
            }
        }
        if order.len() != rows {
            return Err(PluginError::failed("row order is not a permutation"));
        }
        for values in self.columns.values_mut() {
            *values = order.iter().map(|&i| values[i]).collect();
        }
        Ok(())
    }
}
