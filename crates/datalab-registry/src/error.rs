//! Discovery error types

use std::path::{Path, PathBuf};

use datalab_plugin::CapabilityKind;
use datalab_schema::SchemaError;

/// Failure loading a single unit
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Unit file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No registered format handles this file
    #[error("no manifest format for {0}")]
    UnsupportedFormat(PathBuf),

    /// Manifest text is malformed
    #[error("malformed {format} manifest {path}: {message}")]
    Parse {
        /// Unit file
        path: PathBuf,
        /// Format name
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// Declared schema is invalid
    #[error("invalid schema in {path}: {source}")]
    Schema {
        /// Unit file
        path: PathBuf,
        /// Schema error
        #[source]
        source: SchemaError,
    },

    /// Manifest names an implementation that is not registered
    #[error("{path}: unknown implementation entry '{entry}'")]
    UnknownEntry {
        /// Unit file
        path: PathBuf,
        /// Entry name
        entry: String,
    },

    /// Declared kind disagrees with the registered implementation
    #[error("{path}: entry '{entry}' is a {actual}, manifest declares {declared}")]
    KindMismatch {
        /// Unit file
        path: PathBuf,
        /// Entry name
        entry: String,
        /// Kind in the manifest
        declared: CapabilityKind,
        /// Kind of the implementation
        actual: CapabilityKind,
    },

    /// Unit declares no types
    #[error("{0}: unit declares no types")]
    NoTypes(PathBuf),
}

impl LoadError {
    /// Create an IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            format,
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(path: impl Into<PathBuf>, source: SchemaError) -> Self {
        Self::Schema {
            path: path.into(),
            source,
        }
    }
}

/// Result type for unit loading
pub type LoadResult<T> = Result<T, LoadError>;

/// One unit failed to load during discovery; it was logged and skipped
#[derive(Debug, thiserror::Error)]
#[error("skipped {path}: {source}")]
pub struct DiscoveryError {
    /// Unit file
    pub path: PathBuf,
    /// Why it failed
    #[source]
    pub source: LoadError,
}

impl DiscoveryError {
    /// Wrap a load failure
    pub fn new(path: impl Into<PathBuf>, source: LoadError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// File that failed
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Failure of a whole discovery pass
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Plugin directory exists but cannot be listed
    #[error("cannot read plugin directory {path}: {source}")]
    Directory {
        /// Directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Result type for discovery
pub type RegistryResult<T> = Result<T, RegistryError>;
