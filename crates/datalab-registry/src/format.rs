//! Manifest formats
//!
//! Every format turns manifest text into a `serde_json::Value`, so the
//! manifest model is written once. Formats are chosen by file extension;
//! when several claim an extension the highest priority wins.

use std::fmt;
use std::path::Path;

use serde_json::Value as JsonValue;

/// Reads manifest text of one format
pub trait ManifestFormat: Send + Sync + 'static {
    /// Format name used in error messages
    fn name(&self) -> &'static str;

    /// Parse manifest text
    ///
    /// # Errors
    /// Returns the parser's message if the text is malformed
    fn parse(&self, content: &str) -> Result<JsonValue, String>;

    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str];

    /// Format priority (higher = tried first when several match)
    fn priority(&self) -> i32 {
        0
    }

    /// Check if this format handles the given path
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }
}

/// JSON manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl ManifestFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, content: &str) -> Result<JsonValue, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// YAML manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl ManifestFormat for YamlFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, content: &str) -> Result<JsonValue, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    fn extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// TOML manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl ManifestFormat for TomlFormat {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, content: &str) -> Result<JsonValue, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    fn extensions(&self) -> &[&str] {
        &["toml"]
    }
}

/// Priority-ordered set of manifest formats
pub struct FormatRegistry {
    formats: Vec<Box<dyn ManifestFormat>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("format_count", &self.formats.len())
            .field("extensions", &self.all_extensions())
            .finish()
    }
}

impl FormatRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Register a format
    pub fn register<F: ManifestFormat>(&mut self, format: F) {
        self.formats.push(Box::new(format));
        self.formats.sort_by_key(|f| std::cmp::Reverse(f.priority()));
    }

    /// Find the format for a path
    #[must_use]
    pub fn find_for_path(&self, path: &Path) -> Option<&dyn ManifestFormat> {
        self.formats.iter().find(|f| f.can_parse(path)).map(|f| &**f)
    }

    /// All registered extensions, highest priority first
    #[must_use]
    pub fn all_extensions(&self) -> Vec<&str> {
        self.formats
            .iter()
            .flat_map(|f| f.extensions())
            .copied()
            .collect()
    }
}

/// Registry with the JSON, YAML and TOML formats
#[inline]
#[must_use]
pub fn default_formats() -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    registry.register(JsonFormat);
    registry.register(YamlFormat);
    registry.register(TomlFormat);
    registry
}
