//! Unit loading
//!
//! A unit is one file in a plugin directory. Loading it yields a
//! namespace of declared symbols: unit-level metadata plus one or more
//! types, each bound to a registered implementation.
//!
//! The built-in [`ManifestLoader`] reads declarative manifests:
//!
//! ```yaml
//! name: Savgol Filter
//! mode: [post]
//! schema:
//!   - [window_length, Window Length, int, true, 11]
//! entry: savgol_filter
//! ```
//!
//! A unit with several types lists them under `types`, each with its own
//! `symbol`, `entry` and optional `name`, `description`, `mode`, `schema`
//! and `kind`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datalab_plugin::{Capability, CapabilityKind, Implementations};
use datalab_schema::{parse_schema, GroupSpec};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::format::{default_formats, FormatRegistry};

/// Loads one unit file into its declared symbols
pub trait UnitLoader: Send + Sync {
    /// Whether this loader handles the file
    fn accepts(&self, path: &Path) -> bool;

    /// Load the unit
    ///
    /// # Errors
    /// Returns [`LoadError`] if the unit is unreadable or inconsistent
    fn load(&self, path: &Path) -> LoadResult<Unit>;
}

/// Declared contents of one unit
#[derive(Debug, Clone)]
pub struct Unit {
    /// File the unit was loaded from
    pub path: PathBuf,
    /// Unit-level display name
    pub name: Option<String>,
    /// Unit-level description
    pub description: Option<String>,
    /// Unit-level mode tags; `None` when undeclared
    pub mode: Option<Vec<String>>,
    /// Unit-level schema
    pub schema: Option<GroupSpec>,
    /// Declared types
    pub types: Vec<DeclaredType>,
}

/// One type declared by a unit
#[derive(Debug, Clone)]
pub struct DeclaredType {
    /// Symbol within the unit
    pub symbol: String,
    /// Type-level display name
    pub name: Option<String>,
    /// Type-level description
    pub description: Option<String>,
    /// Type-level mode tags
    pub mode: Option<Vec<String>>,
    /// Type-level schema
    pub schema: Option<GroupSpec>,
    /// Resolved lifecycle contract
    pub capability: Capability,
}

impl Unit {
    /// File stem, the fallback display name
    #[must_use]
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A mode declared as one tag or a list of tags
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMode {
    One(String),
    Many(Vec<String>),
}

impl From<RawMode> for Vec<String> {
    fn from(mode: RawMode) -> Self {
        match mode {
            RawMode::One(tag) => vec![tag],
            RawMode::Many(tags) => tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    description: Option<String>,
    mode: Option<RawMode>,
    schema: Option<JsonValue>,
    entry: Option<String>,
    kind: Option<CapabilityKind>,
    #[serde(default)]
    types: Vec<RawType>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    symbol: Option<String>,
    entry: String,
    name: Option<String>,
    description: Option<String>,
    mode: Option<RawMode>,
    schema: Option<JsonValue>,
    kind: Option<CapabilityKind>,
}

/// Loads declarative manifests and binds their entries to implementations
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    formats: Arc<FormatRegistry>,
    implementations: Arc<Implementations>,
}

impl ManifestLoader {
    /// Loader using the default formats
    #[must_use]
    pub fn new(implementations: Arc<Implementations>) -> Self {
        Self::with_formats(default_formats(), implementations)
    }

    /// Loader with a custom format registry
    #[must_use]
    pub fn with_formats(formats: FormatRegistry, implementations: Arc<Implementations>) -> Self {
        Self {
            formats: Arc::new(formats),
            implementations,
        }
    }

    fn schema(path: &Path, raw: Option<JsonValue>) -> LoadResult<Option<GroupSpec>> {
        raw.map(|value| parse_schema(&value).map_err(|e| LoadError::schema(path, e)))
            .transpose()
    }

    fn resolve(&self, path: &Path, entry: &str, declared: Option<CapabilityKind>) -> LoadResult<Capability> {
        let capability = self
            .implementations
            .get(entry)
            .ok_or_else(|| LoadError::UnknownEntry {
                path: path.to_path_buf(),
                entry: entry.to_string(),
            })?;

        if let Some(declared) = declared {
            if declared != capability.kind() {
                return Err(LoadError::KindMismatch {
                    path: path.to_path_buf(),
                    entry: entry.to_string(),
                    declared,
                    actual: capability.kind(),
                });
            }
        }
        Ok(capability.clone())
    }

    fn declared_type(&self, path: &Path, raw: RawType) -> LoadResult<DeclaredType> {
        let capability = self.resolve(path, &raw.entry, raw.kind)?;
        Ok(DeclaredType {
            symbol: raw.symbol.unwrap_or(raw.entry),
            name: raw.name,
            description: raw.description,
            mode: raw.mode.map(Into::into),
            schema: Self::schema(path, raw.schema)?,
            capability,
        })
    }
}

impl UnitLoader for ManifestLoader {
    fn accepts(&self, path: &Path) -> bool {
        self.formats.find_for_path(path).is_some()
    }

    fn load(&self, path: &Path) -> LoadResult<Unit> {
        let format = self
            .formats
            .find_for_path(path)
            .ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;
        let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let value = format
            .parse(&text)
            .map_err(|message| LoadError::parse(path, format.name(), message))?;
        let manifest: RawManifest = serde_json::from_value(value)
            .map_err(|e| LoadError::parse(path, format.name(), e.to_string()))?;

        let mut types = Vec::with_capacity(manifest.types.len() + 1);
        if let Some(entry) = manifest.entry {
            let capability = self.resolve(path, &entry, manifest.kind)?;
            types.push(DeclaredType {
                symbol: entry,
                name: None,
                description: None,
                mode: None,
                schema: None,
                capability,
            });
        }
        for raw in manifest.types {
            types.push(self.declared_type(path, raw)?);
        }
        if types.is_empty() {
            return Err(LoadError::NoTypes(path.to_path_buf()));
        }

        debug!(path = %path.display(), format = format.name(), types = types.len(), "loaded unit");
        Ok(Unit {
            path: path.to_path_buf(),
            name: manifest.name,
            description: manifest.description,
            mode: manifest.mode.map(Into::into),
            schema: Self::schema(path, manifest.schema)?,
            types,
        })
    }
}
