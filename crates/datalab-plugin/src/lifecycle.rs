//! Lifecycle contracts
//!
//! Each plugin type satisfies exactly one of these traits. The engine calls
//! them in a fixed order and never holds instances beyond one invocation
//! (renderers excepted, which live for as long as they are active).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use datalab_schema::ValueTree;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};
use crate::store::TableStore;
use crate::surface::{StyleSnapshot, Surface};
use crate::table::Table;

/// Directory names after which the data-set name follows
const DATASET_ROOTS: [&str; 3] = ["raw", "preprocessed", "postprocessed"];

/// Parameter overriding the derived data-set name
pub const DATASET_PARAM: &str = "cooldown";

/// Stage of a transformer invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Constructing the plugin instance
    Instantiate,
    /// Reading input
    Load,
    /// Computing results
    Process,
    /// Writing results
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Instantiate => "instantiate",
            Self::Load => "load",
            Self::Process => "process",
            Self::Persist => "persist",
        })
    }
}

/// One-shot transform of an input file into persisted output
///
/// Stages run in order; a failing stage aborts the rest of the invocation.
pub trait Transformer {
    /// Read input data; a no-op when data was preloaded
    ///
    /// # Errors
    /// Returns error if the input cannot be read
    fn load(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Compute results
    ///
    /// # Errors
    /// Returns error if processing fails
    fn process(&mut self) -> PluginResult<()>;

    /// Write results, returning the files written
    ///
    /// # Errors
    /// Returns error if writing fails
    fn persist(&mut self) -> PluginResult<Vec<PathBuf>>;
}

/// In-place data transform, a pure function of its bound parameters
pub trait InlineMutator {
    /// Transform a table
    ///
    /// `Ok(None)` means the step produced no value, which callers treat as
    /// a failure.
    ///
    /// # Errors
    /// Returns error if the transform fails
    fn process(&self, table: Table) -> PluginResult<Option<Table>>;
}

/// Whether a change to the active renderer set needs a full surface reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetSignal {
    /// Incremental update is enough
    #[default]
    Keep,
    /// Surface must be reset before re-applying
    Reset,
}

impl ResetSignal {
    /// Whether a reset was requested
    #[inline]
    #[must_use]
    pub fn is_reset(self) -> bool {
        matches!(self, Self::Reset)
    }
}

impl From<bool> for ResetSignal {
    fn from(reset: bool) -> Self {
        if reset {
            Self::Reset
        } else {
            Self::Keep
        }
    }
}

impl BitOr for ResetSignal {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from(self.is_reset() || rhs.is_reset())
    }
}

impl BitOrAssign for ResetSignal {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Stateful visual module applied to and retracted from a surface
pub trait StatefulRenderer {
    /// Prepare global state before drawing
    fn initialize(&mut self, _style: &StyleSnapshot) -> ResetSignal {
        ResetSignal::Keep
    }

    /// Apply visuals to the surface
    ///
    /// # Errors
    /// Returns error if the surface rejects the change
    fn apply(&mut self, surface: &mut dyn Surface, style: &StyleSnapshot) -> PluginResult<()>;

    /// Undo what `apply` did
    fn retract(&mut self, _surface: &mut dyn Surface, _style: &StyleSnapshot) -> ResetSignal {
        ResetSignal::Keep
    }
}

/// Everything a transformer is constructed with
#[derive(Clone)]
pub struct TransformerInit {
    /// Input file
    pub input: PathBuf,
    /// Root directory outputs go under
    pub output_root: PathBuf,
    /// Bound parameters
    pub params: ValueTree,
    /// Preloaded input, if the caller already read it
    pub data: Option<Table>,
    /// Table reader/writer
    pub store: Arc<dyn TableStore>,
}

impl fmt::Debug for TransformerInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerInit")
            .field("input", &self.input)
            .field("output_root", &self.output_root)
            .field("params", &self.params)
            .field("data", &self.data.as_ref().map(Table::column_names))
            .finish_non_exhaustive()
    }
}

impl TransformerInit {
    /// Create init data without preloaded input
    pub fn new(
        input: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        params: ValueTree,
        store: Arc<dyn TableStore>,
    ) -> Self {
        Self {
            input: input.into(),
            output_root: output_root.into(),
            params,
            data: None,
            store,
        }
    }

    /// Attach preloaded input data
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: Table) -> Self {
        self.data = Some(data);
        self
    }

    /// Input table: the preloaded data, or read through the store
    ///
    /// # Errors
    /// Returns error if the input cannot be read
    pub fn load_table(&self) -> PluginResult<Table> {
        match &self.data {
            Some(table) => Ok(table.clone()),
            None => self.store.read(&self.input),
        }
    }

    /// Data-set name outputs are grouped under
    ///
    /// The `cooldown` parameter wins; otherwise it is derived from the input
    /// path (see [`dataset_name_from_path`]).
    #[must_use]
    pub fn dataset_name(&self) -> String {
        match self.params.text(DATASET_PARAM) {
            Some(name) => name.to_string(),
            None => dataset_name_from_path(&self.input).unwrap_or_default(),
        }
    }

    /// Output file path: `output_root/dataset[/subfolder]/file_name`
    #[must_use]
    pub fn output_path(&self, file_name: &str, subfolder: Option<&str>) -> PathBuf {
        let mut path = self.output_root.join(self.dataset_name());
        if let Some(sub) = subfolder.filter(|s| !s.is_empty()) {
            path.push(sub);
        }
        path.push(file_name);
        path
    }

    /// Write a table to `output_path(file_name, subfolder)`
    ///
    /// # Errors
    /// Returns error if the store fails
    pub fn persist_table(
        &self,
        table: &Table,
        file_name: &str,
        subfolder: Option<&str>,
    ) -> PluginResult<PathBuf> {
        let path = self.output_path(file_name, subfolder);
        self.store.write(&path, table)?;
        Ok(path)
    }

    /// Input file stem, used to name outputs
    ///
    /// # Errors
    /// Returns error if the input path has no file name
    pub fn input_stem(&self) -> PluginResult<String> {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| PluginError::failed(format!("input {} has no file name", self.input.display())))
    }
}

/// Data-set name from a path: the component following the first of
/// `raw`, `preprocessed` or `postprocessed` (checked in that order)
///
/// ```
/// use datalab_plugin::dataset_name_from_path;
/// use std::path::Path;
///
/// let path = Path::new("data/raw/25B1_Tr/run_002.dat");
/// assert_eq!(dataset_name_from_path(path).as_deref(), Some("25B1_Tr"));
/// ```
#[must_use]
pub fn dataset_name_from_path(path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    DATASET_ROOTS.iter().find_map(|root| {
        let idx = parts.iter().position(|p| p == root)?;
        parts.get(idx + 1).cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonTableStore;

    fn init(input: &str, params: ValueTree) -> TransformerInit {
        TransformerInit::new(input, "/out/pre", params, Arc::new(JsonTableStore))
    }

    #[test]
    fn reset_signals_or_together() {
        let mut signal = ResetSignal::Keep;
        signal |= ResetSignal::Keep;
        assert!(!signal.is_reset());
        signal |= ResetSignal::Reset;
        assert!(signal.is_reset());
        assert_eq!(ResetSignal::Keep | ResetSignal::Reset, ResetSignal::Reset);
    }

    #[test]
    fn dataset_name_follows_known_roots() {
        assert_eq!(
            dataset_name_from_path(Path::new("/d/preprocessed/cd7/x.json")).as_deref(),
            Some("cd7")
        );
        assert_eq!(dataset_name_from_path(Path::new("/d/other/x.json")), None);
        assert_eq!(dataset_name_from_path(Path::new("/d/raw")), None);
    }

    #[test]
    fn raw_is_checked_before_later_roots() {
        let path = Path::new("/postprocessed/a/raw/b/x.dat");
        assert_eq!(dataset_name_from_path(path).as_deref(), Some("b"));
    }

    #[test]
    fn dataset_param_overrides_path() {
        let params = ValueTree::new().with(DATASET_PARAM, "manual");
        assert_eq!(init("/d/raw/cd1/x.dat", params).dataset_name(), "manual");
    }

    #[test]
    fn output_path_joins_dataset_and_subfolder() {
        let init = init("/d/raw/cd1/x.dat", ValueTree::new());

        assert_eq!(init.output_path("y.json", None), PathBuf::from("/out/pre/cd1/y.json"));
        assert_eq!(
            init.output_path("y.json", Some("math")),
            PathBuf::from("/out/pre/cd1/math/y.json")
        );
        assert_eq!(init.input_stem().unwrap(), "x");
    }

    #[test]
    fn preloaded_data_skips_store() {
        let table = Table::from_columns([("a", vec![1.0])]).unwrap();
        let init = init("/does/not/exist.json", ValueTree::new()).with_data(table.clone());
        assert_eq!(init.load_table().unwrap(), table);
    }
}
