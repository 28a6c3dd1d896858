//! Subcommand bodies

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use datalab_core::{run_config, EngineConfig, Pipeline, PlotConfig, PluginCategory, RenderSession};
use datalab_modules::builtin_implementations;
use datalab_plugin::{AutoTableStore, MemorySurface, Surface, TableStore};
use datalab_registry::{Catalog, ModeFilter, Registry};
use datalab_schema::{schema_to_json, validate_all, ValidationContext, ValueTree};
use serde_json::json;

fn registry(engine: &EngineConfig) -> Registry {
    Registry::with_manifests(Arc::new(builtin_implementations())).with_config(engine.registry_config())
}

fn discover_in(engine: &EngineConfig, category: PluginCategory, filter: &ModeFilter) -> anyhow::Result<Catalog> {
    let dir = engine.plugin_dir(category);
    registry(engine)
        .discover(dir, filter)
        .with_context(|| format!("cannot scan {category} plugins in {}", dir.display()))
}

/// Parameter or config file; YAML by extension, JSON otherwise
fn read_tree(path: &Path) -> anyhow::Result<ValueTree> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let tree = if is_yaml {
        ValueTree::from_yaml(&text)
    } else {
        ValueTree::from_json(&text)
    };
    tree.with_context(|| format!("cannot parse {}", path.display()))
}

pub(crate) fn discover(
    engine: &EngineConfig,
    category: PluginCategory,
    filter: &ModeFilter,
    as_json: bool,
) -> anyhow::Result<ExitCode> {
    let catalog = discover_in(engine, category, filter)?;

    if as_json {
        let listing: Vec<_> = catalog
            .iter()
            .map(|d| {
                json!({
                    "name": d.display_name,
                    "kind": d.kind(),
                    "modes": d.mode_tags,
                    "description": d.description,
                    "fingerprint": d.fingerprint.to_string(),
                    "source": d.source,
                    "schema": schema_to_json(&d.schema),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for d in catalog.iter() {
            let modes = if d.mode_tags.is_empty() {
                "-".to_string()
            } else {
                d.mode_tags.join(",")
            };
            println!(
                "{:<24} {:<12} {:<10} {}",
                d.display_name,
                d.kind().to_string(),
                modes,
                d.fingerprint.short()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn validate(
    engine: &EngineConfig,
    category: PluginCategory,
    module: &str,
    params: &Path,
    columns: Option<&[String]>,
) -> anyhow::Result<ExitCode> {
    let catalog = discover_in(engine, category, &ModeFilter::All)?;
    let descriptor = catalog
        .get(module)
        .with_context(|| format!("no {category} module named '{module}'"))?;
    let tree = read_tree(params)?;

    let ctx = match columns {
        Some(columns) => ValidationContext::new().with_columns(columns),
        None => ValidationContext::new(),
    };
    let errors = validate_all(&descriptor.schema, &tree, &ctx);
    if errors.is_empty() {
        println!("{}: parameters are valid", descriptor.display_name);
        return Ok(ExitCode::SUCCESS);
    }
    for error in &errors {
        println!("{error}");
    }
    Ok(ExitCode::FAILURE)
}

pub(crate) fn process(engine: &EngineConfig, config: &Path, input: Option<&Path>) -> anyhow::Result<ExitCode> {
    let tree = read_tree(config)?;
    let catalog = discover_in(engine, PluginCategory::Processing, &ModeFilter::All)?;
    let written = run_config(&tree, input, &catalog, engine, Arc::new(AutoTableStore))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn pipeline(
    engine: &EngineConfig,
    pipeline: &Path,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let text = fs::read_to_string(pipeline).with_context(|| format!("cannot read {}", pipeline.display()))?;
    let pipeline = Pipeline::from_json(&text)?;
    let table = AutoTableStore
        .read(input)
        .with_context(|| format!("cannot load {}", input.display()))?;

    let result = pipeline.apply(&table, &registry(engine), engine.plugin_dir(PluginCategory::Manipulation))?;

    match output {
        Some(path) => {
            AutoTableStore.write(path, &result)?;
            println!("{}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn render(engine: &EngineConfig, plot_config: &Path) -> anyhow::Result<ExitCode> {
    let text = fs::read_to_string(plot_config).with_context(|| format!("cannot read {}", plot_config.display()))?;
    let config = PlotConfig::from_json(&text)?;
    let catalog = discover_in(engine, PluginCategory::Plot, &ModeFilter::All)?;

    let mut session = RenderSession::new(engine.style.clone());
    let mut surface = MemorySurface::new();
    let report = session.import(&config, &catalog, &mut surface);

    println!("style = {}", surface.style());
    for (key, value) in surface.properties() {
        println!("{key} = {value}");
    }
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_yaml_and_json_parameter_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("p.yaml");
        let json = dir.path().join("p.json");
        fs::write(&yaml, "window_length: 7\n").unwrap();
        fs::write(&json, r#"{"window_length": 7}"#).unwrap();

        assert_eq!(read_tree(&yaml).unwrap(), read_tree(&json).unwrap());
        assert!(read_tree(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn discovery_problems_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("normalize.json"),
            r#"{"name": "Normalize", "entry": "normalize", "schema": []}"#,
        )
        .unwrap();
        fs::write(dir.path().join("copy.json"), r#"{"name": "Normalize", "entry": "normalize", "schema": []}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let engine = EngineConfig::new().with_plugin_dir(PluginCategory::Manipulation, dir.path());

        let catalog = discover_in(&engine, PluginCategory::Manipulation, &ModeFilter::All).unwrap();

        assert_eq!(catalog.names(), vec!["Normalize"]);
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.collisions().len(), 1);
    }
}
