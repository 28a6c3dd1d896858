//! Schema wire format
//!
//! Plugins declare their schema as a list of entries, each either a tuple
//! `[name, label, kind, required, default?]` or an object with the same
//! keys. A `_%d` suffix on the name marks a repeatable node; `kind` is a
//! type string, a list of literal options, or `{fields: [...]}` for a group.
//!
//! Parsing works on `serde_json::Value`, so any format serde can read into
//! JSON values (YAML, TOML) feeds the same parser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};
use tracing::warn;

use crate::error::{SchemaError, SchemaResult};
use crate::spec::{
    ContextSource, FieldKind, FieldSpec, GroupSpec, Multiplicity, Presentation, Primitive,
    SchemaNode,
};
use crate::value::Scalar;

/// Name suffix marking a repeatable node
pub const MULTIPLICITY_MARKER: &str = "_%d";

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)_%d$").expect("valid multiplicity marker regex"));

/// Split a wire name into its base name and multiplicity
///
/// ```
/// use datalab_schema::{split_marker, Multiplicity};
///
/// assert_eq!(split_marker("filters_%d"), ("filters", Multiplicity::Repeated));
/// assert_eq!(split_marker("x_column"), ("x_column", Multiplicity::Single));
/// ```
#[must_use]
pub fn split_marker(name: &str) -> (&str, Multiplicity) {
    match MARKER_RE.captures(name).and_then(|c| c.get(1)) {
        Some(base) => (base.as_str(), Multiplicity::Repeated),
        None => (name, Multiplicity::Single),
    }
}

fn wire_name(name: &str, multiplicity: Multiplicity) -> String {
    match multiplicity {
        Multiplicity::Single => name.to_string(),
        Multiplicity::Repeated => format!("{name}{MULTIPLICITY_MARKER}"),
    }
}

/// Parse a schema declaration (a list of entries)
///
/// # Errors
/// Returns [`SchemaError::InvalidEntry`] naming the offending entry, or
/// [`SchemaError::DuplicateName`] if siblings collide after marker stripping
pub fn parse_schema(value: &JsonValue) -> SchemaResult<GroupSpec> {
    let entries = match value {
        JsonValue::Array(entries) => entries.as_slice(),
        JsonValue::Null => &[],
        other => {
            return Err(SchemaError::invalid(
                "schema",
                format!("expected a list of entries, got {}", json_kind(other)),
            ))
        }
    };

    let mut root = GroupSpec::root();
    root.fields = parse_nodes(entries, "schema")?;
    root.check_unique_names()?;
    Ok(root)
}

fn parse_nodes(entries: &[JsonValue], location: &str) -> SchemaResult<Vec<SchemaNode>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_node(entry, &format!("{location}[{i}]")))
        .collect()
}

struct RawEntry<'a> {
    name: &'a str,
    label: &'a str,
    kind: &'a JsonValue,
    required: bool,
    default: Option<&'a JsonValue>,
}

impl<'a> RawEntry<'a> {
    fn from_tuple(parts: &'a [JsonValue], location: &str) -> SchemaResult<Self> {
        if !(4..=5).contains(&parts.len()) {
            return Err(SchemaError::invalid(
                location,
                format!(
                    "expected [name, label, kind, required, default?], got {} elements",
                    parts.len()
                ),
            ));
        }
        Ok(Self {
            name: text(&parts[0], location, "name")?,
            label: text(&parts[1], location, "label")?,
            kind: &parts[2],
            required: flag(&parts[3], location)?,
            default: parts.get(4).filter(|d| !d.is_null()),
        })
    }

    fn from_object(map: &'a Map<String, JsonValue>, location: &str) -> SchemaResult<Self> {
        let name = map
            .get("name")
            .ok_or_else(|| SchemaError::invalid(location, "missing 'name'"))
            .and_then(|v| text(v, location, "name"))?;
        let label = match map.get("label") {
            Some(v) => text(v, location, "label")?,
            None => name,
        };
        let kind = map
            .get("kind")
            .ok_or_else(|| SchemaError::invalid(location, "missing 'kind'"))?;
        let required = match map.get("required") {
            Some(v) => flag(v, location)?,
            None => false,
        };
        Ok(Self {
            name,
            label,
            kind,
            required,
            default: map.get("default").filter(|d| !d.is_null()),
        })
    }
}

fn parse_node(entry: &JsonValue, location: &str) -> SchemaResult<SchemaNode> {
    let raw = match entry {
        JsonValue::Array(parts) => RawEntry::from_tuple(parts, location)?,
        JsonValue::Object(map) => RawEntry::from_object(map, location)?,
        other => {
            return Err(SchemaError::invalid(
                location,
                format!("expected a tuple or an object, got {}", json_kind(other)),
            ))
        }
    };

    let (base, marked) = split_marker(raw.name);

    if let JsonValue::Object(group) = raw.kind {
        return parse_group(&raw, base, marked, group, location).map(SchemaNode::Group);
    }

    let kind = parse_kind(raw.kind, location)?;
    let default = raw
        .default
        .map(|d| scalar_from_json(d, location).and_then(|s| check_default(&kind, s, location)))
        .transpose()?;

    Ok(SchemaNode::Field(FieldSpec {
        name: base.to_string(),
        label: raw.label.to_string(),
        kind,
        required: raw.required,
        default,
        multiplicity: marked,
    }))
}

/// Coerce a declared default to the field's storage type
///
/// The empty string is kept as is; it means "no value".
fn check_default(kind: &FieldKind, default: Scalar, location: &str) -> SchemaResult<Scalar> {
    if default.is_empty() {
        return Ok(default);
    }
    let storage = kind.storage();
    let coerced = default.coerce(storage).ok_or_else(|| {
        SchemaError::invalid(location, format!("default '{default}' is not a valid {storage}"))
    })?;
    if let FieldKind::Choice(options) = kind {
        let text = default.to_string();
        if !options.contains(&text) {
            return Err(SchemaError::invalid(
                location,
                format!("default '{text}' is not one of {}", options.join(", ")),
            ));
        }
    }
    Ok(coerced)
}

fn parse_group(
    raw: &RawEntry<'_>,
    base: &str,
    marked: Multiplicity,
    group: &Map<String, JsonValue>,
    location: &str,
) -> SchemaResult<GroupSpec> {
    let fields = match group.get("fields") {
        Some(JsonValue::Array(fields)) => fields,
        Some(other) => {
            return Err(SchemaError::invalid(
                location,
                format!("group 'fields' must be a list, got {}", json_kind(other)),
            ))
        }
        None => return Err(SchemaError::invalid(location, "group kind needs 'fields'")),
    };

    let legacy = group.get("type").and_then(JsonValue::as_str);
    let multiplicity = match (marked, legacy) {
        (Multiplicity::Single, Some("multi")) => {
            warn!(
                field = raw.name,
                "group type 'multi' is deprecated; append '{MULTIPLICITY_MARKER}' to the name instead"
            );
            Multiplicity::Repeated
        }
        (Multiplicity::Repeated, Some("group")) => {
            warn!(
                field = raw.name,
                "group type 'group' on a repeatable name is deprecated; drop the '{MULTIPLICITY_MARKER}' suffix"
            );
            Multiplicity::Single
        }
        (m, _) => m,
    };

    let mut spec = GroupSpec::new(base, raw.label);
    spec.required = raw.required;
    spec.multiplicity = multiplicity;
    spec.fields = parse_nodes(fields, &format!("{location}.fields"))?;
    Ok(spec)
}

fn parse_kind(kind: &JsonValue, location: &str) -> SchemaResult<FieldKind> {
    match kind {
        JsonValue::String(name) => match name.as_str() {
            "str" | "string" => Ok(FieldKind::Primitive(Primitive::String)),
            "int" | "integer" => Ok(FieldKind::Primitive(Primitive::Integer)),
            "float" => Ok(FieldKind::Primitive(Primitive::Float)),
            "bool" | "boolean" | "checkbox" => Ok(FieldKind::Primitive(Primitive::Boolean)),
            "dropdown_column" => Ok(FieldKind::Context(ContextSource::DataColumn)),
            "textarea" => Ok(FieldKind::Hint(Presentation::MultiLine)),
            "color" => Ok(FieldKind::Hint(Presentation::Color)),
            "label" => Ok(FieldKind::Hint(Presentation::Label)),
            other => Err(SchemaError::invalid(location, format!("unknown kind '{other}'"))),
        },
        JsonValue::Array(options) => options
            .iter()
            .map(|o| match o {
                JsonValue::String(s) => Ok(s.clone()),
                JsonValue::Number(n) => Ok(n.to_string()),
                JsonValue::Bool(b) => Ok(b.to_string()),
                other => Err(SchemaError::invalid(
                    location,
                    format!("option must be a literal, got {}", json_kind(other)),
                )),
            })
            .collect::<SchemaResult<Vec<_>>>()
            .map(FieldKind::Choice),
        other => Err(SchemaError::invalid(
            location,
            format!("kind must be a type name, a list of options or a group, got {}", json_kind(other)),
        )),
    }
}

fn text<'a>(value: &'a JsonValue, location: &str, what: &str) -> SchemaResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::invalid(location, format!("{what} must be a string")))
}

fn flag(value: &JsonValue, location: &str) -> SchemaResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| SchemaError::invalid(location, "required must be true or false"))
}

fn scalar_from_json(value: &JsonValue, location: &str) -> SchemaResult<Scalar> {
    match value {
        JsonValue::Bool(b) => Ok(Scalar::Bool(*b)),
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Scalar::Integer(i)),
            (None, Some(f)) => Ok(Scalar::Float(f)),
            (None, None) => Err(SchemaError::invalid(location, format!("default {n} out of range"))),
        },
        JsonValue::String(s) => Ok(Scalar::Text(s.clone())),
        other => Err(SchemaError::invalid(
            location,
            format!("default must be a literal, got {}", json_kind(other)),
        )),
    }
}

fn scalar_to_json(value: &Scalar) -> JsonValue {
    match value {
        Scalar::Bool(b) => JsonValue::Bool(*b),
        Scalar::Integer(i) => json!(i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Scalar::Text(s) => JsonValue::String(s.clone()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "an object",
    }
}

/// Render a schema back to its wire form (object entries, markers attached)
#[must_use]
pub fn schema_to_json(spec: &GroupSpec) -> JsonValue {
    JsonValue::Array(spec.fields().iter().map(node_to_json).collect())
}

fn node_to_json(node: &SchemaNode) -> JsonValue {
    let mut entry = Map::new();
    entry.insert(
        "name".into(),
        JsonValue::String(wire_name(node.name(), node.multiplicity())),
    );
    entry.insert("label".into(), JsonValue::String(node.label().to_string()));
    match node {
        SchemaNode::Field(field) => {
            entry.insert("kind".into(), kind_to_json(&field.kind));
            entry.insert("required".into(), JsonValue::Bool(field.required));
            if let Some(default) = &field.default {
                entry.insert("default".into(), scalar_to_json(default));
            }
        }
        SchemaNode::Group(group) => {
            entry.insert("kind".into(), json!({ "fields": schema_to_json(group) }));
            entry.insert("required".into(), JsonValue::Bool(group.required));
        }
    }
    JsonValue::Object(entry)
}

fn kind_to_json(kind: &FieldKind) -> JsonValue {
    match kind {
        FieldKind::Primitive(p) => JsonValue::String(p.as_str().to_string()),
        FieldKind::Choice(options) => json!(options),
        FieldKind::Context(ContextSource::DataColumn) => json!("dropdown_column"),
        FieldKind::Hint(Presentation::MultiLine) => json!("textarea"),
        FieldKind::Hint(Presentation::Color) => json!("color"),
        FieldKind::Hint(Presentation::Label) => json!("label"),
    }
}

impl Serialize for GroupSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        schema_to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GroupSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        parse_schema(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tuple_entries_with_marker() {
        let spec = parse_schema(&json!([
            ["x_column", "X", "dropdown_column", true],
            ["thresholds_%d", "Threshold", "float", false]
        ]))
        .unwrap();

        let expected = GroupSpec::root()
            .with_field(
                FieldSpec::new("x_column", "X", FieldKind::Context(ContextSource::DataColumn))
                    .required(),
            )
            .with_field(
                FieldSpec::new("thresholds", "Threshold", FieldKind::Primitive(Primitive::Float))
                    .repeated(),
            );
        assert_eq!(spec, expected);
    }

    #[test]
    fn repeatable_group_with_nested_fields() {
        let spec = parse_schema(&json!([
            ["filters_%d", "Filter", {"fields": [
                ["col", "Col", "dropdown_column", true],
                ["val", "Val", "float", true]
            ]}, true]
        ]))
        .unwrap();

        let Some(SchemaNode::Group(group)) = spec.find("filters") else {
            panic!("expected group");
        };
        assert_eq!(group.multiplicity, Multiplicity::Repeated);
        assert!(group.required);
        assert_eq!(group.fields().len(), 2);
    }

    #[test]
    fn object_entries_and_defaults() {
        let spec = parse_schema(&json!([
            {"name": "window_length", "label": "Window", "kind": "int", "default": 11},
            {"name": "style", "kind": ["-", "--", ":"], "required": true, "default": "--"},
            {"name": "scale", "label": "Scale", "kind": "float", "default": 0.5}
        ]))
        .unwrap();

        let Some(SchemaNode::Field(window)) = spec.find("window_length") else {
            panic!("expected field");
        };
        assert_eq!(window.default, Some(Scalar::Integer(11)));
        assert!(!window.required);

        let Some(SchemaNode::Field(style)) = spec.find("style") else {
            panic!("expected field");
        };
        assert_eq!(style.label, "style");
        assert_eq!(style.kind, FieldKind::Choice(vec!["-".into(), "--".into(), ":".into()]));

        let Some(SchemaNode::Field(scale)) = spec.find("scale") else {
            panic!("expected field");
        };
        assert_eq!(scale.default, Some(Scalar::Float(0.5)));
    }

    #[test]
    fn legacy_group_types_still_parse() {
        let spec = parse_schema(&json!([
            ["filters", "Filter", {"type": "multi", "fields": [["c", "C", "str", false]]}, false],
            ["fit_%d", "Fit", {"type": "group", "fields": [["o", "O", "int", false]]}, false]
        ]))
        .unwrap();

        assert_eq!(spec.find("filters").map(SchemaNode::multiplicity), Some(Multiplicity::Repeated));
        assert_eq!(spec.find("fit").map(SchemaNode::multiplicity), Some(Multiplicity::Single));
    }

    #[test]
    fn unknown_kind_names_location() {
        let err = parse_schema(&json!([
            ["a", "A", "str", false],
            ["g", "G", {"fields": [["b", "B", "decimal", false]]}, false]
        ]))
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid schema entry at schema[1].fields[0]: unknown kind 'decimal'"
        );
    }

    #[test]
    fn marker_collision_is_duplicate() {
        let err = parse_schema(&json!([
            ["a", "A", "str", false],
            ["a_%d", "A", "str", false]
        ]))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { .. }));
    }

    #[test]
    fn wrong_tuple_length_rejected() {
        let err = parse_schema(&json!([["a", "A", "str"]])).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEntry { .. }));
    }

    #[test]
    fn defaults_must_fit_their_kind() {
        let err = parse_schema(&json!([["window_length", "Window", "int", false, "wide"]])).unwrap_err();
        assert!(err.to_string().contains("schema[0]"), "{err}");
        assert!(err.to_string().contains("'wide'"), "{err}");

        let err = parse_schema(&json!([["axes", "Axes", ["x", "y"], false, "z"]])).unwrap_err();
        assert!(err.to_string().contains("not one of x, y"), "{err}");
    }

    #[test]
    fn defaults_are_stored_coerced() {
        let spec = parse_schema(&json!([
            ["window_length", "Window", "int", false, "7"],
            ["scale", "Scale", "float", false, 2],
            ["show", "Show", "checkbox", false, "yes"],
            ["title", "Title", "str", false, ""]
        ]))
        .unwrap();

        let default = |name: &str| match spec.find(name) {
            Some(SchemaNode::Field(field)) => field.default.clone(),
            _ => panic!("expected field {name}"),
        };
        assert_eq!(default("window_length"), Some(Scalar::Integer(7)));
        assert_eq!(default("scale"), Some(Scalar::Float(2.0)));
        assert_eq!(default("show"), Some(Scalar::Bool(true)));
        assert_eq!(default("title"), Some(Scalar::Text(String::new())));
    }

    #[test]
    fn rendered_schema_parses_back() {
        let spec = parse_schema(&json!([
            ["label", "Label", "str", false, "fit"],
            ["show", "Show", "checkbox", false, true],
            ["columns_%d", "Column", {"fields": [
                ["colname", "Name", "str", true],
                ["expression", "Expression", "str", false, "*1"]
            ]}, true]
        ]))
        .unwrap();

        assert_eq!(parse_schema(&schema_to_json(&spec)).unwrap(), spec);
    }

    #[test]
    fn yaml_declarations_feed_the_same_parser() {
        let yaml = "- [x, X, float, true]\n- name: tags_%d\n  label: Tag\n  kind: str\n";
        let value: JsonValue = serde_yaml::from_str(yaml).unwrap();
        let spec = parse_schema(&value).unwrap();

        assert_eq!(spec.find("tags").map(SchemaNode::multiplicity), Some(Multiplicity::Repeated));
    }
}
