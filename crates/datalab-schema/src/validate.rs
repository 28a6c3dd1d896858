//! Structural validation of value trees
//!
//! Depth-first, in declaration order. [`validate`] stops at the first
//! failure; [`validate_all`] collects every failure in the same order.

use std::ops::ControlFlow;

use crate::error::{FieldError, FieldPath, Reason};
use crate::spec::{ContextSource, FieldKind, FieldSpec, GroupSpec, Multiplicity, SchemaNode};
use crate::value::{Scalar, Shape, Value, ValueTree};

/// Caller-supplied facts used to resolve context enumerations
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    columns: Option<&'a [String]>,
}

impl<'a> ValidationContext<'a> {
    /// Context with no data attached; column fields accept any text
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the column names of the data the module will see
    #[inline]
    #[must_use]
    pub fn with_columns(mut self, columns: &'a [String]) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Known column names, if any
    #[inline]
    #[must_use]
    pub fn columns(&self) -> Option<&'a [String]> {
        self.columns
    }
}

/// Validate a tree against a schema, stopping at the first failure
///
/// # Errors
/// Returns the first [`FieldError`] in declaration order
pub fn validate(spec: &GroupSpec, tree: &ValueTree) -> Result<(), FieldError> {
    validate_with(spec, tree, &ValidationContext::new())
}

/// Validate with a caller context
///
/// # Errors
/// Returns the first [`FieldError`] in declaration order
pub fn validate_with(
    spec: &GroupSpec,
    tree: &ValueTree,
    ctx: &ValidationContext<'_>,
) -> Result<(), FieldError> {
    let mut walker = Walker::new(ctx, true);
    let _ = walker.nodes(spec.fields(), tree, &FieldPath::root());
    match walker.errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Validate and return every failure
#[must_use]
pub fn validate_all(
    spec: &GroupSpec,
    tree: &ValueTree,
    ctx: &ValidationContext<'_>,
) -> Vec<FieldError> {
    let mut walker = Walker::new(ctx, false);
    let _ = walker.nodes(spec.fields(), tree, &FieldPath::root());
    walker.errors
}

struct Walker<'c, 'a> {
    ctx: &'c ValidationContext<'a>,
    first_only: bool,
    errors: Vec<FieldError>,
}

impl<'c, 'a> Walker<'c, 'a> {
    fn new(ctx: &'c ValidationContext<'a>, first_only: bool) -> Self {
        Self {
            ctx,
            first_only,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, path: FieldPath, reason: Reason) -> ControlFlow<()> {
        self.errors.push(FieldError::new(path, reason));
        if self.first_only {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn nodes(&mut self, nodes: &[SchemaNode], tree: &ValueTree, parent: &FieldPath) -> ControlFlow<()> {
        for node in nodes {
            let path = parent.child(node.name(), node.label());
            let value = tree.get(node.name());
            match node {
                SchemaNode::Field(field) => match field.multiplicity {
                    Multiplicity::Single => self.single_field(field, value, path)?,
                    Multiplicity::Repeated => self.repeated_field(field, value, &path)?,
                },
                SchemaNode::Group(group) => match group.multiplicity {
                    Multiplicity::Single => self.static_group(group, value, path)?,
                    Multiplicity::Repeated => self.repeated_group(group, value, &path)?,
                },
            }
        }
        ControlFlow::Continue(())
    }

    fn single_field(&mut self, field: &FieldSpec, value: Option<&Value>, path: FieldPath) -> ControlFlow<()> {
        match value {
            None => self.missing(field.required, path),
            Some(Value::Scalar(s)) if s.is_empty() => self.missing(field.required, path),
            Some(Value::Scalar(s)) => self.scalar(field, s, path),
            Some(other) => self.fail(
                path,
                Reason::ShapeMismatch {
                    expected: Shape::Scalar,
                    found: other.shape(),
                },
            ),
        }
    }

    fn repeated_field(&mut self, field: &FieldSpec, value: Option<&Value>, path: &FieldPath) -> ControlFlow<()> {
        let items: &[Scalar] = match value {
            None => &[],
            Some(v) if v.is_empty_sequence() => &[],
            Some(Value::Sequence(items)) => items,
            Some(other) => {
                return self.fail(
                    path.clone(),
                    Reason::ShapeMismatch {
                        expected: Shape::Sequence,
                        found: other.shape(),
                    },
                )
            }
        };

        if items.is_empty() {
            return self.missing(field.required, path.clone());
        }

        for (i, item) in items.iter().enumerate() {
            let element = path.at(i + 1);
            if item.is_empty() {
                self.missing(field.required, element)?;
            } else {
                self.scalar(field, item, element)?;
            }
        }
        ControlFlow::Continue(())
    }

    fn static_group(&mut self, group: &GroupSpec, value: Option<&Value>, path: FieldPath) -> ControlFlow<()> {
        match value {
            None => self.missing(group.required, path),
            Some(Value::Group(tree)) => {
                // an empty mapping is the same as no value
                if tree.is_empty() {
                    return self.missing(group.required, path);
                }
                self.nodes(group.fields(), tree, &path)
            }
            Some(other) => self.fail(
                path,
                Reason::ShapeMismatch {
                    expected: Shape::Mapping,
                    found: other.shape(),
                },
            ),
        }
    }

    fn repeated_group(&mut self, group: &GroupSpec, value: Option<&Value>, path: &FieldPath) -> ControlFlow<()> {
        let items: &[ValueTree] = match value {
            None => &[],
            Some(v) if v.is_empty_sequence() => &[],
            Some(Value::Groups(items)) => items,
            Some(other) => {
                return self.fail(
                    path.clone(),
                    Reason::ShapeMismatch {
                        expected: Shape::Mappings,
                        found: other.shape(),
                    },
                )
            }
        };

        if items.is_empty() {
            return self.missing(group.required, path.clone());
        }

        for (i, item) in items.iter().enumerate() {
            self.nodes(group.fields(), item, &path.at(i + 1))?;
        }
        ControlFlow::Continue(())
    }

    fn missing(&mut self, required: bool, path: FieldPath) -> ControlFlow<()> {
        if required {
            self.fail(path, Reason::MissingRequired)
        } else {
            ControlFlow::Continue(())
        }
    }

    fn scalar(&mut self, field: &FieldSpec, value: &Scalar, path: FieldPath) -> ControlFlow<()> {
        match &field.kind {
            FieldKind::Primitive(p) => {
                if value.coerce(*p).is_none() {
                    return self.fail(
                        path,
                        Reason::TypeMismatch {
                            expected: *p,
                            found: value.to_string(),
                        },
                    );
                }
            }
            FieldKind::Choice(options) => {
                let text = value.to_string();
                if !options.iter().any(|o| *o == text) {
                    return self.fail(
                        path,
                        Reason::NotAnOption {
                            value: text,
                            options: options.clone(),
                        },
                    );
                }
            }
            FieldKind::Context(ContextSource::DataColumn) => {
                if let Some(columns) = self.ctx.columns() {
                    let text = value.to_string();
                    if !columns.iter().any(|c| *c == text) {
                        return self.fail(path, Reason::UnknownColumn { value: text });
                    }
                }
            }
            FieldKind::Hint(_) => {}
        }
        ControlFlow::Continue(())
    }
}
