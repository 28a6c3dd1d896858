//! Schema fingerprints
//!
//! A [`SchemaFingerprint`] is the Blake3 hash of a schema's canonical wire
//! form. Two discoveries of the same plugin yield equal fingerprints unless
//! the declared schema changed.

use std::fmt::{self, Display, Formatter};

use serde_json::Value as JsonValue;

use crate::spec::GroupSpec;
use crate::wire::schema_to_json;

/// 32-byte Blake3 hash of a canonical schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaFingerprint([u8; 32]);

impl SchemaFingerprint {
    /// Raw bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for SchemaFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Fingerprint a schema
#[must_use]
pub fn fingerprint(spec: &GroupSpec) -> SchemaFingerprint {
    let canonical = canonical_json(&schema_to_json(spec));
    SchemaFingerprint(*blake3::hash(canonical.as_bytes()).as_bytes())
}

/// JSON with object keys sorted, no whitespace
fn canonical_json(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", JsonValue::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        JsonValue::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{FieldKind, FieldSpec, Primitive};

    fn schema(default: i64) -> GroupSpec {
        GroupSpec::root().with_field(
            FieldSpec::new("w", "W", FieldKind::Primitive(Primitive::Integer)).with_default(default),
        )
    }

    #[test]
    fn equal_schemas_share_fingerprint() {
        assert_eq!(fingerprint(&schema(11)), fingerprint(&schema(11)));
        assert_eq!(fingerprint(&schema(11)).to_string().len(), 64);
        assert_eq!(fingerprint(&schema(11)).short().len(), 16);
    }

    #[test]
    fn changed_default_changes_fingerprint() {
        assert_ne!(fingerprint(&schema(11)), fingerprint(&schema(21)));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let value = serde_json::json!({"b": 1, "a": {"d": [1, 2], "c": "x"}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":"x","d":[1,2]},"b":1}"#);
    }
}
