//! Error types for the datalab engine
//!
//! - Validation failures, surfaced before anything is instantiated
//! - Resolution failures, when a name selects no usable module
//! - Stage failures inside a plugin, wrapped with module and stage
//! - Pipeline failures, wrapped with the 1-based step position

use std::path::PathBuf;

use datalab_plugin::{CapabilityKind, PluginError, Stage};
use datalab_registry::RegistryError;
use datalab_schema::{FieldError, SchemaError};

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Values do not fit the module's schema
    #[error("invalid configuration for '{module}': {source}")]
    Validation {
        /// Module being configured
        module: String,
        /// First failing field
        #[source]
        source: FieldError,
    },

    /// Name selects no usable module
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A plugin stage failed
    #[error(transparent)]
    Stage(#[from] StageError),

    /// A pipeline step or edit failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Directory scan failed
    #[error("discovery failed: {0}")]
    Discovery(#[from] RegistryError),

    /// Serialized document is malformed
    #[error("serialization error: {0}")]
    Serialization(#[from] SchemaError),

    /// Engine configuration is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Create a validation error
    pub fn validation(module: impl Into<String>, source: FieldError) -> Self {
        Self::Validation {
            module: module.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller can fix its input and retry
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation { .. } | Self::Resolution(_) | Self::Config(_) => true,
            Self::Pipeline(PipelineError::Step { source, .. }) => source.is_recoverable(),
            Self::Pipeline(PipelineError::OutOfRange { .. }) => true,
            _ => false,
        }
    }

    /// Pipeline position (1-based) of a step failure
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Pipeline(PipelineError::Step { position, .. }) => Some(*position),
            _ => None,
        }
    }

    /// Module the failure is attributed to
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Validation { module, .. } => Some(module),
            Self::Resolution(e) => Some(e.module()),
            Self::Stage(e) => Some(&e.module),
            Self::Pipeline(PipelineError::Step { module, .. }) => Some(module),
            _ => None,
        }
    }
}

/// Name selects no usable module
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No descriptor has this name
    #[error("module '{module}' not found")]
    NotFound {
        /// Requested name
        module: String,
    },

    /// Descriptor exists but has the wrong lifecycle contract
    #[error("module '{module}' is a {actual}, expected a {expected}")]
    WrongKind {
        /// Requested name
        module: String,
        /// Contract the caller needs
        expected: CapabilityKind,
        /// Contract the module has
        actual: CapabilityKind,
    },
}

impl ResolutionError {
    /// Create a not-found error
    pub fn not_found(module: impl Into<String>) -> Self {
        Self::NotFound {
            module: module.into(),
        }
    }

    /// Requested name
    #[must_use]
    pub fn module(&self) -> &str {
        match self {
            Self::NotFound { module } | Self::WrongKind { module, .. } => module,
        }
    }
}

/// A plugin stage failed
#[derive(Debug, thiserror::Error)]
#[error("{module}: {stage} failed: {source}")]
pub struct StageError {
    /// Stage that failed
    pub stage: Stage,
    /// Module name
    pub module: String,
    /// Plugin error
    #[source]
    pub source: PluginError,
}

impl StageError {
    /// Wrap a plugin error
    pub fn new(stage: Stage, module: impl Into<String>, source: PluginError) -> Self {
        Self {
            stage,
            module: module.into(),
            source,
        }
    }
}

/// Pipeline failures
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A step failed; the pipeline stopped there
    #[error("error during step {position} ('{module}'): {source}")]
    Step {
        /// 1-based position
        position: usize,
        /// Module name
        module: String,
        /// Underlying failure
        #[source]
        source: Box<EngineError>,
    },

    /// Edit referenced a step that does not exist
    #[error("step index {index} out of range (pipeline has {len} steps)")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Pipeline length
        len: usize,
    },
}

impl PipelineError {
    /// Wrap a step failure
    pub fn step(position: usize, module: impl Into<String>, source: EngineError) -> Self {
        Self::Step {
            position,
            module: module.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
