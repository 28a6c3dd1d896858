//! Error types for schemas and value validation

use std::fmt;

use crate::spec::Primitive;
use crate::value::Shape;

/// Errors in schema declarations and value (de)serialization
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema entry could not be understood
    #[error("invalid schema entry at {location}: {message}")]
    InvalidEntry {
        /// Position of the entry, e.g. `fields[2].fields[0]`
        location: String,
        /// What was wrong
        message: String,
    },

    /// Two siblings share a name
    #[error("duplicate field name '{name}' in {scope}")]
    DuplicateName {
        /// Repeated name
        name: String,
        /// Enclosing group name
        scope: String,
    },

    /// JSON (de)serialization failed
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// YAML (de)serialization failed
    #[error("invalid YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),
}

impl SchemaError {
    /// Create an invalid-entry error
    pub fn invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Base name of the node
    pub name: String,
    /// Label of the node
    pub label: String,
    /// 1-based instance index, for elements of sequences
    pub index: Option<usize>,
}

/// Location of a value inside a tree, by labels and instance indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Empty path (the root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend with a child node
    #[must_use]
    pub fn child(&self, name: &str, label: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment {
            name: name.to_string(),
            label: label.to_string(),
            index: None,
        });
        Self { segments }
    }

    /// Mark the last segment with a 1-based instance index
    #[must_use]
    pub fn at(&self, index: usize) -> Self {
        let mut path = self.clone();
        if let Some(last) = path.segments.last_mut() {
            last.index = Some(index);
        }
        path
    }

    /// Segments from the root
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Base name of the innermost node
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.name.as_str())
    }

    /// Machine-readable form, e.g. `filters[2].col`
    #[must_use]
    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s.index {
                Some(i) => format!("{}[{i}]", s.name),
                None => s.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(": ")?;
            }
            f.write_str(&segment.label)?;
            if let Some(index) = segment.index {
                write!(f, " {index}")?;
            }
        }
        Ok(())
    }
}

/// Why a value failed validation
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// Required value is absent or empty
    MissingRequired,
    /// Value cannot be coerced to the declared primitive
    TypeMismatch {
        /// Declared type
        expected: Primitive,
        /// Offending value
        found: String,
    },
    /// Value has the wrong structure
    ShapeMismatch {
        /// Shape the schema asks for
        expected: Shape,
        /// Shape supplied
        found: Shape,
    },
    /// Value is not one of a closed enumeration's options
    NotAnOption {
        /// Offending value
        value: String,
        /// Allowed options
        options: Vec<String>,
    },
    /// Value does not name a column of the data
    UnknownColumn {
        /// Offending value
        value: String,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired => f.write_str("missing required field"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, got '{found}'")
            }
            Self::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected}, got {found}")
            }
            Self::NotAnOption { value, options } => {
                write!(f, "'{value}' is not one of [{}]", options.join(", "))
            }
            Self::UnknownColumn { value } => write!(f, "unknown column '{value}'"),
        }
    }
}

/// Validation failure at a path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Where the failure occurred
    pub path: FieldPath,
    /// What went wrong
    pub reason: Reason,
}

impl FieldError {
    /// Create a field error
    #[inline]
    #[must_use]
    pub fn new(path: FieldPath, reason: Reason) -> Self {
        Self { path, reason }
    }

    /// Whether this is a missing-required failure
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self.reason, Reason::MissingRequired)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Reason::MissingRequired => write!(f, "{} is required", self.path),
            Reason::TypeMismatch { expected, found } => {
                write!(f, "{} must be {expected} (got '{found}')", self.path)
            }
            Reason::ShapeMismatch { expected, found } => {
                write!(f, "{} must be {expected}, not {found}", self.path)
            }
            Reason::NotAnOption { value, options } => write!(
                f,
                "{} must be one of [{}] (got '{value}')",
                self.path,
                options.join(", ")
            ),
            Reason::UnknownColumn { value } => {
                write!(f, "{} names unknown column '{value}'", self.path)
            }
        }
    }
}

impl std::error::Error for FieldError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_displays_labels_and_indices() {
        let path = FieldPath::root()
            .child("filters", "Filter")
            .at(2)
            .child("col", "Col");

        assert_eq!(path.to_string(), "Filter 2: Col");
        assert_eq!(path.dotted(), "filters[2].col");
        assert_eq!(path.field_name(), Some("col"));
    }

    #[test]
    fn missing_required_message() {
        let err = FieldError::new(
            FieldPath::root().child("x_column", "X"),
            Reason::MissingRequired,
        );
        assert_eq!(err.to_string(), "X is required");
        assert!(err.is_missing());
        assert_eq!(err.reason.to_string(), "missing required field");
    }

    #[test]
    fn type_mismatch_message() {
        let err = FieldError::new(
            FieldPath::root().child("val", "Value"),
            Reason::TypeMismatch {
                expected: Primitive::Float,
                found: "abc".into(),
            },
        );
        assert_eq!(err.to_string(), "Value must be float (got 'abc')");
    }
}
