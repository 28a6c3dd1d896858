//! Configuration Schemas for datalab
//!
//! Declarative grammar for the configuration surface a plugin exposes,
//! plus the runtime values shaped by it.
//!
//! # Core Concepts
//!
//! - **[`SchemaNode`]**: tagged union of [`FieldSpec`] leaves and
//!   [`GroupSpec`] composites; nesting is arbitrary
//! - **[`Multiplicity`]**: single value or ordered sequence of instances;
//!   the `_%d` name marker exists only in the wire format
//! - **[`ValueTree`]**: base name to scalar, sequence, mapping or sequence
//!   of mappings
//! - **[`validate`] / [`bind`]**: structural checks, defaults and coercion
//! - **[`Form`]**: live, editable instance of a schema with symmetric
//!   [`collect`] and [`apply`]
//!
//! # Example
//!
//! ```
//! use datalab_schema::{bind, FieldKind, FieldSpec, GroupSpec, Primitive, ValueTree};
//!
//! let schema = GroupSpec::root()
//!     .with_field(FieldSpec::new("window", "Window", FieldKind::Primitive(Primitive::Integer))
//!         .with_default(11_i64));
//!
//! let bound = bind(&schema, &ValueTree::new()).unwrap();
//! assert_eq!(bound.integer("window"), Some(11));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bind;
pub mod error;
pub mod fingerprint;
pub mod form;
pub mod spec;
pub mod validate;
pub mod value;
pub mod wire;

pub use bind::{bind, bind_with};
pub use error::{FieldError, FieldPath, PathSegment, Reason, SchemaError, SchemaResult};
pub use fingerprint::{fingerprint, SchemaFingerprint};
pub use form::{apply, collect, Form, FormError, Slot};
pub use spec::{
    ContextSource, FieldKind, FieldSpec, GroupSpec, Multiplicity, Presentation, Primitive,
    SchemaNode,
};
pub use validate::{validate, validate_all, validate_with, ValidationContext};
pub use value::{Scalar, Shape, Value, ValueTree};
pub use wire::{parse_schema, schema_to_json, split_marker, MULTIPLICITY_MARKER};
