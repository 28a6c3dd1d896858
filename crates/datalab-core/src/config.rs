//! Engine configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! reserved_prefix = "__"
//!
//! [plugins]
//! processing = "plugins/processing"
//! manipulation = "plugins/manipulation"
//! plot = "plugins/plot"
//!
//! [output]
//! preprocessed = "data/preprocessed"
//! postprocessed = "data/postprocessed"
//!
//! [style]
//! "grid.alpha" = 0.5
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use datalab_plugin::StyleSnapshot;
use datalab_registry::{RegistryConfig, DEFAULT_RESERVED_PREFIX};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Plugin directory category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    /// Transformers writing processed files
    Processing,
    /// Inline mutators for pipelines
    Manipulation,
    /// Stateful renderers
    Plot,
}

impl PluginCategory {
    /// All categories
    pub const ALL: [Self; 3] = [Self::Processing, Self::Manipulation, Self::Plot];

    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Manipulation => "manipulation",
            Self::Plot => "plot",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EngineError::config(format!("unknown plugin category '{s}'")))
    }
}

/// Plugin directory per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDirs {
    /// Processing plugins
    pub processing: PathBuf,
    /// Manipulation plugins
    pub manipulation: PathBuf,
    /// Plot plugins
    pub plot: PathBuf,
}

impl Default for PluginDirs {
    fn default() -> Self {
        Self {
            processing: PathBuf::from("plugins/processing"),
            manipulation: PathBuf::from("plugins/manipulation"),
            plot: PathBuf::from("plugins/plot"),
        }
    }
}

/// Output roots per processing mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputRoots {
    /// Root for `pre` transformers
    pub preprocessed: PathBuf,
    /// Root for `post` transformers
    pub postprocessed: PathBuf,
}

impl Default for OutputRoots {
    fn default() -> Self {
        Self {
            preprocessed: PathBuf::from("data/preprocessed"),
            postprocessed: PathBuf::from("data/postprocessed"),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Files starting with this prefix are not plugins
    pub reserved_prefix: String,
    /// Plugin directories
    pub plugins: PluginDirs,
    /// Output roots
    pub output: OutputRoots,
    /// Style defaults handed to renderers
    pub style: StyleSnapshot,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            plugins: PluginDirs::default(),
            output: OutputRoots::default(),
            style: default_style(),
        }
    }
}

/// Default style values renderers restore on retract
#[must_use]
pub fn default_style() -> StyleSnapshot {
    StyleSnapshot::new()
        .with("grid.color", "#b0b0b0")
        .with("grid.linestyle", "-")
        .with("grid.linewidth", 0.8)
        .with("grid.alpha", 1.0)
        .with("legend.loc", "best")
        .with("style", "default")
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text; style keys not given keep their defaults
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the text is not valid TOML for
    /// this configuration
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| EngineError::config(e.to_string()))?;
        let mut style = default_style();
        for (key, value) in config.style.iter() {
            style = style.with(key, value.clone());
        }
        config.style = style;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if serialization fails
    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::config(e.to_string()))
    }

    /// With reserved prefix
    #[inline]
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    /// With plugin directory for a category
    #[must_use]
    pub fn with_plugin_dir(mut self, category: PluginCategory, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match category {
            PluginCategory::Processing => self.plugins.processing = dir,
            PluginCategory::Manipulation => self.plugins.manipulation = dir,
            PluginCategory::Plot => self.plugins.plot = dir,
        }
        self
    }

    /// With output roots
    #[inline]
    #[must_use]
    pub fn with_output_roots(
        mut self,
        preprocessed: impl Into<PathBuf>,
        postprocessed: impl Into<PathBuf>,
    ) -> Self {
        self.output = OutputRoots {
            preprocessed: preprocessed.into(),
            postprocessed: postprocessed.into(),
        };
        self
    }

    /// With style defaults
    #[inline]
    #[must_use]
    pub fn with_style(mut self, style: StyleSnapshot) -> Self {
        self.style = style;
        self
    }

    /// Plugin directory for a category
    #[must_use]
    pub fn plugin_dir(&self, category: PluginCategory) -> &Path {
        match category {
            PluginCategory::Processing => &self.plugins.processing,
            PluginCategory::Manipulation => &self.plugins.manipulation,
            PluginCategory::Plot => &self.plugins.plot,
        }
    }

    /// Output root for a transformer mode tag
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] for tags other than `pre` and `post`
    pub fn output_root(&self, mode: &str) -> EngineResult<&Path> {
        match mode {
            "pre" => Ok(&self.output.preprocessed),
            "post" => Ok(&self.output.postprocessed),
            other => Err(EngineError::config(format!("unknown module mode '{other}'"))),
        }
    }

    /// Discovery settings
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default().with_reserved_prefix(self.reserved_prefix.clone())
    }
}
