//! Live, editable instances of a schema
//!
//! A [`Form`] mirrors what a configuration dialog holds: one entry per
//! field, editable rows for multi-value fields and instances for
//! repeatable groups. [`collect`] reads a form into a [`ValueTree`];
//! [`apply`] writes a tree back into a form.

use indexmap::IndexMap;
use tracing::warn;

use crate::spec::{FieldKind, FieldSpec, GroupSpec, Multiplicity, Presentation, Primitive, SchemaNode};
use crate::value::{Scalar, Value, ValueTree};

/// Errors from form editing operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// No node with this name in the schema or form
    #[error("no field named '{0}'")]
    UnknownField(String),

    /// Row operation on a single-valued node
    #[error("'{0}' does not hold multiple entries")]
    NotRepeatable(String),

    /// Entry operation on a container
    #[error("'{0}' is not a single entry")]
    NotAnEntry(String),

    /// Removing the last row of a required container
    #[error("{label} needs at least one entry")]
    LastRequiredRow {
        /// Label of the container
        label: String,
    },

    /// Row index outside the container
    #[error("row {index} out of range for '{name}' ({len} rows)")]
    OutOfRange {
        /// Container name
        name: String,
        /// Requested 0-based index
        index: usize,
        /// Current row count
        len: usize,
    },
}

/// Content of one form slot
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Single entry
    Entry(Scalar),
    /// Rows of a multi-value field
    Rows(Vec<Scalar>),
    /// Static group
    Group(Form),
    /// Instances of a repeatable group
    Instances(Vec<Form>),
}

/// Live instance of a schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Form {
    slots: IndexMap<String, Slot>,
}

impl Form {
    /// Form as first shown: empty entries, one row per container
    #[must_use]
    pub fn fresh(spec: &GroupSpec) -> Self {
        Self::build(spec, false)
    }

    /// Form populated from schema defaults
    #[must_use]
    pub fn with_defaults(spec: &GroupSpec) -> Self {
        Self::build(spec, true)
    }

    /// Discard every entry and repopulate from schema defaults
    pub fn reset_to_defaults(&mut self, spec: &GroupSpec) {
        *self = Self::with_defaults(spec);
    }

    fn build(spec: &GroupSpec, defaults: bool) -> Self {
        let slots = spec
            .fields()
            .iter()
            .map(|node| {
                let slot = match node {
                    SchemaNode::Field(field) => {
                        let entry = initial_entry(field, defaults);
                        match field.multiplicity {
                            Multiplicity::Single => Slot::Entry(entry),
                            Multiplicity::Repeated => Slot::Rows(vec![entry]),
                        }
                    }
                    SchemaNode::Group(group) => {
                        let form = Self::build(group, defaults);
                        match group.multiplicity {
                            Multiplicity::Single => Slot::Group(form),
                            Multiplicity::Repeated => Slot::Instances(vec![form]),
                        }
                    }
                };
                (node.name().to_string(), slot)
            })
            .collect();
        Self { slots }
    }

    /// Slot for `name`
    #[inline]
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Set a single entry
    ///
    /// # Errors
    /// Fails if `name` is unknown or not a single entry
    pub fn set(&mut self, name: &str, value: impl Into<Scalar>) -> Result<(), FormError> {
        match self.slots.get_mut(name) {
            Some(Slot::Entry(entry)) => {
                *entry = value.into();
                Ok(())
            }
            Some(_) => Err(FormError::NotAnEntry(name.to_string())),
            None => Err(FormError::UnknownField(name.to_string())),
        }
    }

    /// Set one row of a multi-value field
    ///
    /// # Errors
    /// Fails if `name` is not a multi-value field or `index` is out of range
    pub fn set_row(&mut self, name: &str, index: usize, value: impl Into<Scalar>) -> Result<(), FormError> {
        match self.slots.get_mut(name) {
            Some(Slot::Rows(rows)) => {
                let len = rows.len();
                let row = rows.get_mut(index).ok_or_else(|| FormError::OutOfRange {
                    name: name.to_string(),
                    index,
                    len,
                })?;
                *row = value.into();
                Ok(())
            }
            Some(_) => Err(FormError::NotRepeatable(name.to_string())),
            None => Err(FormError::UnknownField(name.to_string())),
        }
    }

    /// Nested form of a static group
    pub fn group_mut(&mut self, name: &str) -> Option<&mut Form> {
        match self.slots.get_mut(name) {
            Some(Slot::Group(form)) => Some(form),
            _ => None,
        }
    }

    /// One instance of a repeatable group
    pub fn instance_mut(&mut self, name: &str, index: usize) -> Option<&mut Form> {
        match self.slots.get_mut(name) {
            Some(Slot::Instances(forms)) => forms.get_mut(index),
            _ => None,
        }
    }

    /// Number of rows or instances in a container
    #[must_use]
    pub fn row_count(&self, name: &str) -> Option<usize> {
        match self.slots.get(name) {
            Some(Slot::Rows(rows)) => Some(rows.len()),
            Some(Slot::Instances(forms)) => Some(forms.len()),
            _ => None,
        }
    }

    /// Append a fresh row or instance, returning the new count
    ///
    /// # Errors
    /// Fails if `name` is not a repeatable node
    pub fn add_row(&mut self, spec: &GroupSpec, name: &str) -> Result<usize, FormError> {
        let len = self.row_count(name).unwrap_or(0);
        self.insert_row(spec, name, len)?;
        Ok(len + 1)
    }

    /// Insert a fresh row or instance so that it lands at `index`
    ///
    /// # Errors
    /// Fails if `name` is not repeatable or `index` is past the end
    pub fn insert_row(&mut self, spec: &GroupSpec, name: &str, index: usize) -> Result<(), FormError> {
        let node = repeatable(spec, name)?;
        match (node, self.slots.get_mut(name)) {
            (SchemaNode::Field(field), Some(Slot::Rows(rows))) => {
                if index > rows.len() {
                    return Err(out_of_range(name, index, rows.len()));
                }
                rows.insert(index, initial_entry(field, false));
            }
            (SchemaNode::Group(group), Some(Slot::Instances(forms))) => {
                if index > forms.len() {
                    return Err(out_of_range(name, index, forms.len()));
                }
                forms.insert(index, Self::fresh(group));
            }
            _ => return Err(FormError::NotRepeatable(name.to_string())),
        }
        Ok(())
    }

    /// Remove a row or instance
    ///
    /// A required container keeps its last row; an optional container that
    /// becomes empty gets a fresh row.
    ///
    /// # Errors
    /// Fails on the last row of a required container, or a bad index
    pub fn remove_row(&mut self, spec: &GroupSpec, name: &str, index: usize) -> Result<(), FormError> {
        let node = repeatable(spec, name)?;
        let len = self.row_count(name).ok_or_else(|| FormError::NotRepeatable(name.to_string()))?;
        if index >= len {
            return Err(out_of_range(name, index, len));
        }
        if len == 1 && node.is_required() {
            return Err(FormError::LastRequiredRow {
                label: node.label().to_string(),
            });
        }

        match (node, self.slots.get_mut(name)) {
            (SchemaNode::Field(field), Some(Slot::Rows(rows))) => {
                rows.remove(index);
                if rows.is_empty() {
                    rows.push(initial_entry(field, false));
                }
            }
            (SchemaNode::Group(group), Some(Slot::Instances(forms))) => {
                forms.remove(index);
                if forms.is_empty() {
                    forms.push(Self::fresh(group));
                }
            }
            _ => return Err(FormError::NotRepeatable(name.to_string())),
        }
        Ok(())
    }

    /// Titles of a repeatable group's instances: "Filter 1 *", "Filter 2 *"
    ///
    /// # Errors
    /// Fails if `name` is not a repeatable node
    pub fn group_titles(&self, spec: &GroupSpec, name: &str) -> Result<Vec<String>, FormError> {
        let node = repeatable(spec, name)?;
        let len = self.row_count(name).ok_or_else(|| FormError::NotRepeatable(name.to_string()))?;
        let marker = if node.is_required() { " *" } else { "" };
        Ok((1..=len)
            .map(|i| format!("{} {i}{marker}", node.label()))
            .collect())
    }
}

fn repeatable<'s>(spec: &'s GroupSpec, name: &str) -> Result<&'s SchemaNode, FormError> {
    let node = spec
        .find(name)
        .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
    if node.multiplicity() == Multiplicity::Repeated {
        Ok(node)
    } else {
        Err(FormError::NotRepeatable(name.to_string()))
    }
}

fn out_of_range(name: &str, index: usize, len: usize) -> FormError {
    FormError::OutOfRange {
        name: name.to_string(),
        index,
        len,
    }
}

fn initial_entry(field: &FieldSpec, defaults: bool) -> Scalar {
    let default = field.default.clone();
    match &field.kind {
        FieldKind::Primitive(Primitive::Boolean) => Scalar::Bool(
            default
                .and_then(|d| d.coerce(Primitive::Boolean))
                .and_then(|d| d.as_bool())
                .unwrap_or(false),
        ),
        // Labels display their default as fixed text
        FieldKind::Hint(Presentation::Label) => default.unwrap_or_else(|| Scalar::from("")),
        // A populated drop-down always has a selection
        FieldKind::Choice(options) => default
            .or_else(|| options.first().map(|o| Scalar::from(o.as_str())))
            .unwrap_or_else(|| Scalar::from("")),
        _ if defaults => default.unwrap_or_else(|| Scalar::from("")),
        _ => Scalar::from(""),
    }
}

/// Read a form into a value tree
///
/// Empty entries and empty group instances are dropped; text is coerced
/// to the declared type, keeping the raw text when coercion fails.
#[must_use]
pub fn collect(spec: &GroupSpec, form: &Form) -> ValueTree {
    let mut out = ValueTree::new();

    for node in spec.fields() {
        let name = node.name();
        let Some(slot) = form.slot(name) else {
            continue;
        };
        match (node, slot) {
            (SchemaNode::Field(field), Slot::Entry(entry)) => {
                if !entry.is_empty() {
                    out.insert(name, collect_scalar(field, entry));
                }
            }
            (SchemaNode::Field(field), Slot::Rows(rows)) => {
                let values: Vec<Scalar> = rows
                    .iter()
                    .filter(|row| !row.is_empty())
                    .map(|row| collect_scalar(field, row))
                    .collect();
                out.insert(name, values);
            }
            (SchemaNode::Group(group), Slot::Group(sub)) => {
                out.insert(name, collect(group, sub));
            }
            (SchemaNode::Group(group), Slot::Instances(forms)) => {
                let instances: Vec<ValueTree> = forms
                    .iter()
                    .map(|sub| collect(group, sub))
                    .filter(|tree| !tree.is_empty())
                    .collect();
                out.insert(name, instances);
            }
            _ => warn!(field = name, "form slot does not match schema, skipped"),
        }
    }

    out
}

fn collect_scalar(field: &FieldSpec, entry: &Scalar) -> Scalar {
    entry
        .coerce(field.kind.storage())
        .unwrap_or_else(|| entry.clone())
}

/// Write a value tree into a form
///
/// Keys absent from the tree leave their slots untouched. Containers are
/// rebuilt from the supplied sequence, keeping one fresh row when the
/// sequence is empty.
pub fn apply(spec: &GroupSpec, tree: &ValueTree, form: &mut Form) {
    for node in spec.fields() {
        let name = node.name();
        let Some(value) = tree.get(name) else {
            continue;
        };
        match (node, value) {
            (SchemaNode::Field(field), Value::Scalar(s)) if field.multiplicity == Multiplicity::Single => {
                form.slots.insert(name.to_string(), Slot::Entry(s.clone()));
            }
            (SchemaNode::Field(field), v)
                if field.multiplicity == Multiplicity::Repeated
                    && (v.is_empty_sequence() || matches!(v, Value::Sequence(_))) =>
            {
                let rows = match v {
                    Value::Sequence(items) if !items.is_empty() => items.clone(),
                    _ => vec![initial_entry(field, false)],
                };
                form.slots.insert(name.to_string(), Slot::Rows(rows));
            }
            (SchemaNode::Group(group), Value::Group(sub)) if group.multiplicity == Multiplicity::Single => {
                if let Some(target) = form.group_mut(name) {
                    apply(group, sub, target);
                } else {
                    let mut target = Form::fresh(group);
                    apply(group, sub, &mut target);
                    form.slots.insert(name.to_string(), Slot::Group(target));
                }
            }
            (SchemaNode::Group(group), v)
                if group.multiplicity == Multiplicity::Repeated
                    && (v.is_empty_sequence() || matches!(v, Value::Groups(_))) =>
            {
                let mut instances: Vec<Form> = match v {
                    Value::Groups(items) => items
                        .iter()
                        .map(|item| {
                            let mut target = Form::fresh(group);
                            apply(group, item, &mut target);
                            target
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                if instances.is_empty() {
                    instances.push(Form::fresh(group));
                }
                form.slots.insert(name.to_string(), Slot::Instances(instances));
            }
            (_, v) => warn!(
                field = name,
                found = %v.shape(),
                "value shape does not match schema, skipped"
            ),
        }
    }
}
