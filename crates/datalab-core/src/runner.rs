//! Transformer invocations
//!
//! One invocation binds parameters, instantiates the transformer, then
//! runs `load`, `process` and `persist`. A failing stage aborts the rest
//! of that invocation only; batch runs carry on with the next input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use datalab_plugin::{
    dataset_name_from_path, Capability, CapabilityKind, PluginError, Stage, TableStore, TransformerInit,
    DATASET_PARAM,
};
use datalab_registry::{Catalog, ModuleDescriptor};
use datalab_schema::{bind, ValueTree};
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ResolutionError, StageError};
use crate::pipeline::resolve;

/// Config key naming the module in an exported processing config
pub const MODULE_KEY: &str = "module";

/// Config key naming the input file in an exported processing config
pub const INPUT_KEY: &str = "input_file";

/// Run one transformer invocation
///
/// `init.params` are validated and bound against the descriptor's schema
/// before the transformer is constructed.
///
/// # Errors
/// Returns [`EngineError::Validation`] for bad parameters, or a
/// [`StageError`] naming the stage that failed
pub fn run_transformer(descriptor: &ModuleDescriptor, mut init: TransformerInit) -> EngineResult<Vec<PathBuf>> {
    let module = descriptor.display_name.as_str();
    let Capability::Transformer(factory) = &descriptor.capability else {
        return Err(ResolutionError::WrongKind {
            module: module.to_string(),
            expected: CapabilityKind::Transformer,
            actual: descriptor.kind(),
        }
        .into());
    };

    init.params = bind(&descriptor.schema, &init.params)
        .map_err(|e| EngineError::validation(module, e))?;
    info!(module, input = %init.input.display(), output_root = %init.output_root.display(), "running transformer");

    let stage_error = |stage: Stage| move |e: PluginError| EngineError::from(StageError::new(stage, module, e));
    let mut transformer = factory(init).map_err(stage_error(Stage::Instantiate))?;
    transformer.load().map_err(stage_error(Stage::Load))?;
    transformer.process().map_err(stage_error(Stage::Process))?;
    let written = transformer.persist().map_err(stage_error(Stage::Persist))?;

    info!(module, files = written.len(), "transformer finished");
    Ok(written)
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Inputs that succeeded, with the files they wrote
    pub succeeded: Vec<(PathBuf, Vec<PathBuf>)>,
    /// Inputs that failed, with the reason
    pub failed: Vec<(PathBuf, EngineError)>,
}

impl BatchReport {
    /// Whether every input succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// All files written
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.succeeded.iter().flat_map(|(_, files)| files.iter().map(PathBuf::as_path))
    }
}

/// Run one transformer over many inputs with the same parameters
///
/// A failed input is logged and recorded; the remaining inputs still run.
pub fn run_batch(
    descriptor: &ModuleDescriptor,
    inputs: &[PathBuf],
    output_root: &Path,
    params: &ValueTree,
    store: &Arc<dyn TableStore>,
) -> BatchReport {
    let mut report = BatchReport::default();
    for input in inputs {
        let init = TransformerInit::new(input, output_root, params.clone(), Arc::clone(store));
        match run_transformer(descriptor, init) {
            Ok(files) => report.succeeded.push((input.clone(), files)),
            Err(e) => {
                error!(module = %descriptor.display_name, input = %input.display(), error = %e, "batch input failed");
                report.failed.push((input.clone(), e));
            }
        }
    }
    info!(
        module = %descriptor.display_name,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "batch finished"
    );
    report
}

/// Run a transformer from an exported processing config
///
/// The config is `{module, input_file?, <params>...}`. `input` overrides
/// `input_file`. The output root comes from the module's first mode tag
/// (`pre` when it has none), and a `cooldown` parameter derived from the
/// input path is added when absent. The input is read up front and handed
/// to the transformer preloaded.
///
/// # Errors
/// Returns [`EngineError::Config`] when `module` or the input is missing
/// or the mode has no output root, [`ResolutionError`] when the module is
/// unknown, or any failure of the invocation
pub fn run_config(
    config: &ValueTree,
    input: Option<&Path>,
    catalog: &Catalog,
    engine: &EngineConfig,
    store: Arc<dyn TableStore>,
) -> EngineResult<Vec<PathBuf>> {
    let module = config
        .text(MODULE_KEY)
        .ok_or_else(|| EngineError::config("processing config must name a 'module'"))?;
    let input = input
        .map(Path::to_path_buf)
        .or_else(|| config.text(INPUT_KEY).map(PathBuf::from))
        .ok_or_else(|| EngineError::config("processing config must name an 'input_file'"))?;

    let descriptor = resolve(catalog, module, CapabilityKind::Transformer)?;
    let mode = descriptor.mode_tags.first().map_or("pre", String::as_str);
    let output_root = engine.output_root(mode)?;
    info!(module, mode, output_root = %output_root.display(), "resolved processing config");

    let mut params = config.clone();
    params.remove(MODULE_KEY);
    params.remove(INPUT_KEY);
    if !params.contains(DATASET_PARAM) {
        if let Some(name) = dataset_name_from_path(&input) {
            info!(cooldown = %name, "derived data-set name");
            params.insert(DATASET_PARAM, name);
        }
    }

    let data = store
        .read(&input)
        .map_err(|e| StageError::new(Stage::Load, module, e))?;
    let init = TransformerInit::new(&input, output_root, params, store).with_data(data);
    run_transformer(descriptor, init)
}
