//! Manipulation pipelines
//!
//! A [`Pipeline`] is an ordered list of `(module name, parameters)` steps.
//! It never holds module instances: each application re-resolves every
//! step against a fresh discovery, binds its parameters, and runs the
//! mutators in order over a private copy of the input.

use std::path::Path;

use datalab_plugin::{Capability, CapabilityKind, InlineMutator, PluginError, Stage, Table};
use datalab_registry::{Catalog, ModeFilter, ModuleDescriptor, Registry};
use datalab_schema::{bind, ValueTree};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{EngineError, EngineResult, PipelineError, ResolutionError, StageError};

/// One pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// Module display name
    pub name: String,
    /// Parameters as configured; bound at application time
    #[serde(default)]
    pub params: ValueTree,
}

impl PipelineStep {
    /// Create a step
    pub fn new(name: impl Into<String>, params: ValueTree) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Ordered manipulation steps
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Empty pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push)
    #[inline]
    #[must_use]
    pub fn with_step(mut self, name: impl Into<String>, params: ValueTree) -> Self {
        self.push(name, params);
        self
    }

    /// Steps in order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Module names in order
    #[must_use]
    pub fn module_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Append a step
    pub fn push(&mut self, name: impl Into<String>, params: ValueTree) {
        self.steps.push(PipelineStep::new(name, params));
    }

    /// Insert a step before `index` (`index == len` appends)
    ///
    /// # Errors
    /// Returns [`PipelineError::OutOfRange`] if `index > len`
    pub fn insert(&mut self, index: usize, step: PipelineStep) -> Result<(), PipelineError> {
        if index > self.steps.len() {
            return Err(self.out_of_range(index));
        }
        self.steps.insert(index, step);
        Ok(())
    }

    /// Remove and return a step
    ///
    /// # Errors
    /// Returns [`PipelineError::OutOfRange`] if there is no such step
    pub fn remove(&mut self, index: usize) -> Result<PipelineStep, PipelineError> {
        if index >= self.steps.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.steps.remove(index))
    }

    /// Drag the step at `from` to the drop position `to`
    ///
    /// `to` is a gap index in the list before the move: `0` drops in front
    /// of the first step, `len` after the last.
    ///
    /// # Errors
    /// Returns [`PipelineError::OutOfRange`] for an invalid index
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<(), PipelineError> {
        let len = self.steps.len();
        if from >= len {
            return Err(self.out_of_range(from));
        }
        if to > len {
            return Err(self.out_of_range(to));
        }
        let step = self.steps.remove(from);
        let dest = if to > from { to - 1 } else { to };
        self.steps.insert(dest, step);
        Ok(())
    }

    /// Replace a step's parameters
    ///
    /// # Errors
    /// Returns [`PipelineError::OutOfRange`] if there is no such step
    pub fn configure(&mut self, index: usize, params: ValueTree) -> Result<(), PipelineError> {
        let len = self.steps.len();
        let step = self
            .steps
            .get_mut(index)
            .ok_or(PipelineError::OutOfRange { index, len })?;
        step.params = params;
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> PipelineError {
        PipelineError::OutOfRange {
            index,
            len: self.steps.len(),
        }
    }

    /// Export as `{"steps": [{"name", "params"}, ...]}`
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::config(format!("cannot export pipeline: {e}")))
    }

    /// Import an exported pipeline
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the document is malformed
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid pipeline document: {e}")))
    }

    /// Resolve and bind every step against `catalog` without running
    ///
    /// # Errors
    /// Returns the first failing step, wrapped with its position
    pub fn validate_against(&self, catalog: &Catalog) -> EngineResult<()> {
        self.prepare(catalog).map(|_| ())
    }

    /// Discover `dir` once and apply the pipeline to `initial`
    ///
    /// # Errors
    /// Returns [`EngineError::Discovery`] if the directory cannot be read,
    /// or the first failing step wrapped with its position
    pub fn apply(&self, initial: &Table, registry: &Registry, dir: &Path) -> EngineResult<Table> {
        if self.is_empty() {
            return Ok(initial.clone());
        }
        let catalog = registry.discover(dir, &ModeFilter::All)?;
        self.apply_with(initial, &catalog)
    }

    /// Apply the pipeline to `initial` using an existing catalog
    ///
    /// `initial` is never modified; on failure the partial result is
    /// discarded.
    ///
    /// # Errors
    /// Returns the first failing step wrapped with its position
    pub fn apply_with(&self, initial: &Table, catalog: &Catalog) -> EngineResult<Table> {
        if self.is_empty() {
            return Ok(initial.clone());
        }
        info!(steps = ?self.module_names(), "applying pipeline");

        let mutators = self.prepare(catalog)?;
        let mut working = initial.clone();
        for (index, (step, mutator)) in self.steps.iter().zip(mutators).enumerate() {
            let position = index + 1;
            working = run_step(&step.name, mutator.as_ref(), working).map_err(|e| {
                error!(module = %step.name, position, error = %e, "pipeline step failed");
                PipelineError::step(position, &step.name, e)
            })?;
            debug!(module = %step.name, position, rows = working.row_count(), "step complete");
        }
        Ok(working)
    }

    /// Resolve, bind and instantiate every step
    fn prepare(&self, catalog: &Catalog) -> EngineResult<Vec<Box<dyn InlineMutator>>> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                instantiate(catalog, step)
                    .map_err(|e| EngineError::from(PipelineError::step(index + 1, &step.name, e)))
            })
            .collect()
    }
}

fn instantiate(catalog: &Catalog, step: &PipelineStep) -> EngineResult<Box<dyn InlineMutator>> {
    let descriptor = resolve(catalog, &step.name, CapabilityKind::Mutator)?;
    let Capability::Mutator(factory) = &descriptor.capability else {
        return Err(ResolutionError::WrongKind {
            module: step.name.clone(),
            expected: CapabilityKind::Mutator,
            actual: descriptor.kind(),
        }
        .into());
    };
    let bound = bind(&descriptor.schema, &step.params)
        .map_err(|e| EngineError::validation(&step.name, e))?;
    factory(&bound).map_err(|e| StageError::new(Stage::Instantiate, &step.name, e).into())
}

fn run_step(name: &str, mutator: &dyn InlineMutator, table: Table) -> EngineResult<Table> {
    match mutator.process(table) {
        Ok(Some(table)) => Ok(table),
        Ok(None) => Err(StageError::new(
            Stage::Process,
            name,
            PluginError::failed("step produced no value"),
        )
        .into()),
        Err(e) => Err(StageError::new(Stage::Process, name, e).into()),
    }
}

/// Find a descriptor by name and check its lifecycle contract
///
/// # Errors
/// Returns [`ResolutionError`] if the name is unknown or the module has a
/// different contract
pub fn resolve<'c>(
    catalog: &'c Catalog,
    name: &str,
    expected: CapabilityKind,
) -> Result<&'c ModuleDescriptor, ResolutionError> {
    let descriptor = catalog.get(name).ok_or_else(|| ResolutionError::not_found(name))?;
    if descriptor.kind() != expected {
        return Err(ResolutionError::WrongKind {
            module: name.to_string(),
            expected,
            actual: descriptor.kind(),
        });
    }
    Ok(descriptor)
}
