//! Plugin Discovery for datalab
//!
//! Scans a plugin directory, loads each unit through a [`UnitLoader`],
//! and turns every declared type into a [`ModuleDescriptor`].
//!
//! # Rules
//!
//! - Non-recursive; files starting with the reserved prefix are ignored
//! - A unit that fails to load is logged and skipped, never fatal
//! - Type-level name, mode and schema win over unit-level ones
//! - Units without a mode are selected only by [`ModeFilter::All`]
//! - On duplicate display names the first descriptor wins and the
//!   collision is recorded
//! - Every [`Registry::discover`] call re-reads the directory

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod descriptor;
pub mod error;
pub mod format;
pub mod loader;
pub mod registry;

pub use descriptor::{ModeFilter, ModuleDescriptor, ALL_MODES};
pub use error::{DiscoveryError, LoadError, LoadResult, RegistryError, RegistryResult};
pub use format::{default_formats, FormatRegistry, JsonFormat, ManifestFormat, TomlFormat, YamlFormat};
pub use loader::{DeclaredType, ManifestLoader, Unit, UnitLoader};
pub use registry::{Catalog, Collision, Registry, RegistryConfig, DEFAULT_RESERVED_PREFIX};
