//! Binding: validation, defaults and coercion
//!
//! Modules only ever see bound trees. Binding never invents values the
//! caller did not supply except through declared defaults; explicit empty
//! strings are kept verbatim and win over defaults.

use crate::error::FieldError;
use crate::spec::{FieldSpec, GroupSpec, Multiplicity, SchemaNode};
use crate::validate::{validate_with, ValidationContext};
use crate::value::{Scalar, Value, ValueTree};

/// Validate `tree` and resolve it into the tree a module receives
///
/// # Errors
/// Returns the first validation failure
pub fn bind(spec: &GroupSpec, tree: &ValueTree) -> Result<ValueTree, FieldError> {
    bind_with(spec, tree, &ValidationContext::new())
}

/// [`bind`] with a caller context
///
/// # Errors
/// Returns the first validation failure
pub fn bind_with(
    spec: &GroupSpec,
    tree: &ValueTree,
    ctx: &ValidationContext<'_>,
) -> Result<ValueTree, FieldError> {
    validate_with(spec, tree, ctx)?;
    Ok(resolve(spec.fields(), tree))
}

fn resolve(nodes: &[SchemaNode], tree: &ValueTree) -> ValueTree {
    let mut out = ValueTree::new();

    for node in nodes {
        let name = node.name();
        let supplied = tree.get(name);
        let resolved = match node {
            SchemaNode::Field(field) => resolve_field(field, supplied),
            SchemaNode::Group(group) => Some(resolve_group(group, supplied)),
        };
        if let Some(value) = resolved {
            out.insert(name, value);
        }
    }

    // Keys the schema does not declare pass through untouched
    for (name, value) in tree.iter() {
        if !out.contains(name) && !nodes.iter().any(|n| n.name() == name) {
            out.insert(name, value.clone());
        }
    }

    out
}

fn resolve_field(field: &FieldSpec, supplied: Option<&Value>) -> Option<Value> {
    let storage = field.kind.storage();
    let coerce = |s: &Scalar| s.coerce(storage).unwrap_or_else(|| s.clone());

    match (field.multiplicity, supplied) {
        (Multiplicity::Single, Some(Value::Scalar(s))) if s.is_empty() => {
            Some(Value::Scalar(s.clone()))
        }
        (Multiplicity::Single, Some(Value::Scalar(s))) => Some(Value::Scalar(coerce(s))),
        (Multiplicity::Single, None) => field.default.as_ref().map(|d| Value::Scalar(coerce(d))),
        (Multiplicity::Repeated, Some(Value::Sequence(items))) => Some(Value::Sequence(
            items.iter().filter(|s| !s.is_empty()).map(coerce).collect(),
        )),
        (Multiplicity::Repeated, Some(v)) if v.is_empty_sequence() => {
            Some(Value::Sequence(Vec::new()))
        }
        (Multiplicity::Repeated, None) => Some(Value::Sequence(
            field.default.iter().map(coerce).collect(),
        )),
        // Unreachable after validation; keep what was supplied
        (_, Some(other)) => Some(other.clone()),
    }
}

fn resolve_group(group: &GroupSpec, supplied: Option<&Value>) -> Value {
    match (group.multiplicity, supplied) {
        (Multiplicity::Single, Some(Value::Group(tree))) => {
            Value::Group(resolve(group.fields(), tree))
        }
        (Multiplicity::Single, _) => Value::Group(resolve(group.fields(), &ValueTree::new())),
        (Multiplicity::Repeated, Some(Value::Groups(items))) => Value::Groups(
            items
                .iter()
                .map(|item| resolve(group.fields(), item))
                .collect(),
        ),
        (Multiplicity::Repeated, _) => Value::Groups(Vec::new()),
    }
}
