//! Schema grammar
//!
//! A schema is a tree of [`SchemaNode`]s. The root of a plugin's
//! configuration surface is itself a [`GroupSpec`] with an empty name.

use std::collections::HashSet;
use std::fmt;

use crate::error::SchemaError;
use crate::value::Scalar;

/// Primitive storage type of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Free text
    String,
    /// Signed integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean flag
    Boolean,
}

impl Primitive {
    /// Lowercase name used in messages and the wire format
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque presentation hint, stored as a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presentation {
    /// Multi-line text area
    MultiLine,
    /// Color value
    Color,
    /// Read-only display label
    Label,
}

/// Source of a context-supplied enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSource {
    /// Column names of the data the module will run against
    DataColumn,
}

/// What values a field accepts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Primitive value coerced to the given type
    Primitive(Primitive),
    /// Closed enumeration of ordered literal options
    Choice(Vec<String>),
    /// Enumeration resolved by the caller at bind time
    Context(ContextSource),
    /// Presentation hint over a string value
    Hint(Presentation),
}

impl FieldKind {
    /// Primitive the field value is stored as
    #[inline]
    #[must_use]
    pub fn storage(&self) -> Primitive {
        match self {
            Self::Primitive(p) => *p,
            Self::Choice(_) | Self::Context(_) | Self::Hint(_) => Primitive::String,
        }
    }
}

/// Whether a node holds one value or an ordered sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Multiplicity {
    /// Exactly one value (or one static group instance)
    #[default]
    Single,
    /// Zero or more instances, stored as a sequence
    Repeated,
}

/// Leaf of the schema tree
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Key under which the value is stored
    pub name: String,
    /// Human-facing label, used in error messages
    pub label: String,
    /// Accepted values
    pub kind: FieldKind,
    /// Whether an empty or absent value fails validation
    pub required: bool,
    /// Value used when the key is absent
    pub default: Option<Scalar>,
    /// Single value or sequence
    pub multiplicity: Multiplicity,
}

impl FieldSpec {
    /// Create an optional, single-valued field
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            default: None,
            multiplicity: Multiplicity::Single,
        }
    }

    /// Mark the field as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as a sequence of values
    #[inline]
    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.multiplicity = Multiplicity::Repeated;
        self
    }

    /// Set the default value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Scalar>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Composite node holding child nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupSpec {
    /// Key under which the group value is stored (empty for the root)
    pub name: String,
    /// Human-facing label
    pub label: String,
    /// Whether the group must hold at least one entry
    pub required: bool,
    /// Static (one instance) or repeatable
    pub multiplicity: Multiplicity,
    /// Child nodes in declaration order
    pub fields: Vec<SchemaNode>,
}

impl GroupSpec {
    /// Root of a configuration surface
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Create an optional static group
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    /// Append a child node
    #[inline]
    #[must_use]
    pub fn with_field(mut self, node: impl Into<SchemaNode>) -> Self {
        self.fields.push(node.into());
        self
    }

    /// Mark the group as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the group as repeatable
    #[inline]
    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.multiplicity = Multiplicity::Repeated;
        self
    }

    /// Child nodes in declaration order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[SchemaNode] {
        &self.fields
    }

    /// Find a direct child by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.iter().find(|node| node.name() == name)
    }

    /// Whether the schema declares no fields at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that names are unique among siblings at every level
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateName`] for the first repeated name
    pub fn check_unique_names(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for node in &self.fields {
            if !seen.insert(node.name()) {
                let scope = if self.name.is_empty() { "<root>" } else { self.name.as_str() };
                return Err(SchemaError::DuplicateName {
                    name: node.name().to_string(),
                    scope: scope.to_string(),
                });
            }
            if let SchemaNode::Group(group) = node {
                group.check_unique_names()?;
            }
        }
        Ok(())
    }
}

/// Node of the schema tree
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Leaf value
    Field(FieldSpec),
    /// Nested group
    Group(GroupSpec),
}

impl SchemaNode {
    /// Base name of the node
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Group(g) => &g.name,
        }
    }

    /// Label of the node
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Field(f) => &f.label,
            Self::Group(g) => &g.label,
        }
    }

    /// Whether the node is required
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        match self {
            Self::Field(f) => f.required,
            Self::Group(g) => g.required,
        }
    }

    /// Multiplicity of the node
    #[inline]
    #[must_use]
    pub fn multiplicity(&self) -> Multiplicity {
        match self {
            Self::Field(f) => f.multiplicity,
            Self::Group(g) => g.multiplicity,
        }
    }
}

impl From<FieldSpec> for SchemaNode {
    fn from(field: FieldSpec) -> Self {
        Self::Field(field)
    }
}

impl From<GroupSpec> for SchemaNode {
    fn from(group: GroupSpec) -> Self {
        Self::Group(group)
    }
}
