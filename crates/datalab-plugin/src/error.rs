//! Errors raised by plugin implementations

use std::path::PathBuf;

/// Failure inside a plugin
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// A bound parameter is unusable for this plugin
    #[error("invalid parameter '{name}': {message}")]
    InvalidParam {
        /// Parameter name
        name: String,
        /// What was wrong
        message: String,
    },

    /// Referenced column is not in the table
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// Column length differs from the table's row count
    #[error("column '{name}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        /// Column name
        name: String,
        /// Table row count
        expected: usize,
        /// Column length
        actual: usize,
    },

    /// A stage ran before data was available
    #[error("no data loaded")]
    NoData,

    /// IO error on a table file
    #[error("io error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Table file could not be parsed or written
    #[error("invalid table file {path}: {message}")]
    Format {
        /// File involved
        path: PathBuf,
        /// What was wrong
        message: String,
    },

    /// Plugin-specific failure
    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    /// Create an invalid-parameter error
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a format error for path
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a plugin-specific failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;
