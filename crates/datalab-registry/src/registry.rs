//! Directory discovery
//!
//! [`Registry::discover`] scans one flat plugin directory. Every call is a
//! complete re-scan; nothing is cached between calls, so edits to unit
//! files show up on the next discovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datalab_plugin::Implementations;
use datalab_schema::{fingerprint, GroupSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::descriptor::{ModeFilter, ModuleDescriptor};
use crate::error::{DiscoveryError, RegistryError, RegistryResult};
use crate::loader::{DeclaredType, ManifestLoader, Unit, UnitLoader};

/// Default prefix of ignored files
pub const DEFAULT_RESERVED_PREFIX: &str = "__";

/// Discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Files whose name starts with this are ignored
    pub reserved_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Set the reserved prefix
    #[inline]
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }
}

/// Two units declared the same display name; the first was kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// Contested display name
    pub name: String,
    /// Unit whose descriptor was kept
    pub kept: PathBuf,
    /// Unit whose descriptor was dropped
    pub ignored: PathBuf,
}

/// Result of one discovery pass
#[derive(Debug, Default)]
pub struct Catalog {
    descriptors: Vec<ModuleDescriptor>,
    skipped: Vec<DiscoveryError>,
    collisions: Vec<Collision>,
}

impl Catalog {
    /// Selected descriptors in discovery order
    #[inline]
    #[must_use]
    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    /// Units that failed to load
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> &[DiscoveryError] {
        &self.skipped
    }

    /// Display-name collisions
    #[inline]
    #[must_use]
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Find a descriptor by display name, falling back to symbol
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.display_name == name)
            .or_else(|| self.descriptors.iter().find(|d| d.symbol == name))
    }

    /// Display names in discovery order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.display_name.as_str()).collect()
    }

    /// Iterate descriptors
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.iter()
    }

    /// Number of descriptors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no descriptor was selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Take the descriptors
    #[must_use]
    pub fn into_descriptors(self) -> Vec<ModuleDescriptor> {
        self.descriptors
    }

    fn push(&mut self, descriptor: ModuleDescriptor) {
        if let Some(existing) = self
            .descriptors
            .iter()
            .find(|d| d.display_name == descriptor.display_name)
        {
            warn!(
                module = %descriptor.display_name,
                kept = %existing.source.display(),
                ignored = %descriptor.source.display(),
                "duplicate module name"
            );
            self.collisions.push(Collision {
                name: descriptor.display_name,
                kept: existing.source.clone(),
                ignored: descriptor.source,
            });
            return;
        }
        self.descriptors.push(descriptor);
    }
}

/// Discovers plugin units through a chain of loaders
pub struct Registry {
    loaders: Vec<Box<dyn UnitLoader>>,
    config: RegistryConfig,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("loader_count", &self.loaders.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Registry {
    /// Registry without loaders
    #[inline]
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            loaders: Vec::new(),
            config,
        }
    }

    /// Registry reading manifests bound to `implementations`
    #[must_use]
    pub fn with_manifests(implementations: Arc<Implementations>) -> Self {
        Self::new(RegistryConfig::default()).with_loader(ManifestLoader::new(implementations))
    }

    /// Add a loader; earlier loaders are asked first
    #[inline]
    #[must_use]
    pub fn with_loader<L: UnitLoader + 'static>(mut self, loader: L) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Replace the configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Scan `dir` and return the descriptors selected by `filter`
    ///
    /// A missing directory yields an empty catalog. Units that fail to load
    /// are logged and recorded in [`Catalog::skipped`].
    ///
    /// # Errors
    /// Returns [`RegistryError::Directory`] if `dir` exists but cannot be
    /// listed
    pub fn discover(&self, dir: &Path, filter: &ModeFilter) -> RegistryResult<Catalog> {
        let mut catalog = Catalog::default();
        if !dir.is_dir() {
            warn!(path = %dir.display(), "plugin directory not found");
            return Ok(catalog);
        }

        for path in self.candidates(dir)? {
            let Some(loader) = self.loaders.iter().find(|l| l.accepts(&path)) else {
                debug!(path = %path.display(), "no loader for file");
                continue;
            };
            match loader.load(&path) {
                Ok(unit) => {
                    for descriptor in describe(unit) {
                        if filter.matches(&descriptor.mode_tags) {
                            catalog.push(descriptor);
                        }
                    }
                }
                Err(source) => {
                    warn!(path = %path.display(), error = %source, "skipping plugin unit");
                    catalog.skipped.push(DiscoveryError::new(path, source));
                }
            }
        }

        info!(
            path = %dir.display(),
            filter = %filter,
            modules = catalog.len(),
            skipped = catalog.skipped.len(),
            "discovery complete"
        );
        Ok(catalog)
    }

    /// Regular files directly in `dir`, reserved names removed, sorted
    fn candidates(&self, dir: &Path) -> RegistryResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|source| RegistryError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                let reserved = p
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&self.config.reserved_prefix));
                if reserved {
                    debug!(path = %p.display(), "reserved file ignored");
                }
                !reserved
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Turn a loaded unit into descriptors, one per declared type
///
/// Type-level metadata wins over unit-level. A lone type falls back to the
/// unit name and then the file stem; with several types, unnamed ones are
/// called `stem.symbol`.
fn describe(unit: Unit) -> Vec<ModuleDescriptor> {
    let stem = unit.stem();
    let single = unit.types.len() == 1;

    unit.types
        .into_iter()
        .map(|declared| {
            let DeclaredType {
                symbol,
                name,
                description,
                mode,
                schema,
                capability,
            } = declared;

            let display_name = name.unwrap_or_else(|| match (&unit.name, single) {
                (Some(unit_name), true) => unit_name.clone(),
                (None, true) => stem.clone(),
                (_, false) => format!("{stem}.{symbol}"),
            });
            let schema = schema
                .or_else(|| unit.schema.clone())
                .unwrap_or_else(GroupSpec::root);

            ModuleDescriptor {
                display_name,
                description: description.or_else(|| unit.description.clone()),
                capability,
                mode_tags: mode.or_else(|| unit.mode.clone()).unwrap_or_default(),
                fingerprint: fingerprint(&schema),
                schema,
                source: unit.path.clone(),
                symbol,
            }
        })
        .collect()
}
