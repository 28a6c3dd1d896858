//! Transformer invocations: single, batch and from exported configs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datalab_core::{run_batch, run_config, EngineConfig, EngineError};
use datalab_plugin::{
    AutoTableStore, Capability, Implementations, PluginError, PluginResult, Stage, Table, TableStore,
    Transformer, TransformerInit,
};
use datalab_registry::{Catalog, ModeFilter, Registry};
use datalab_schema::ValueTree;
use datalab_test_utils::PluginDir;
use pretty_assertions::assert_eq;
use serde_json::json;

/// Multiplies `V` by `factor` and writes `<stem>_scaled.json`
struct Scale {
    init: TransformerInit,
    table: Option<Table>,
}

impl Transformer for Scale {
    fn load(&mut self) -> PluginResult<()> {
        self.table = Some(self.init.load_table()?);
        Ok(())
    }

    fn process(&mut self) -> PluginResult<()> {
        let factor = self.init.params.float("factor").unwrap_or(1.0);
        if factor < 0.0 {
            return Err(PluginError::invalid_param("factor", "must not be negative"));
        }
        let table = self.table.as_mut().ok_or(PluginError::NoData)?;
        let column = table
            .column_mut("V")
            .ok_or_else(|| PluginError::MissingColumn("V".into()))?;
        for v in column.iter_mut() {
            *v *= factor;
        }
        Ok(())
    }

    fn persist(&mut self) -> PluginResult<Vec<PathBuf>> {
        let table = self.table.as_ref().ok_or(PluginError::NoData)?;
        let name = format!("{}_scaled.json", self.init.input_stem()?);
        Ok(vec![self.init.persist_table(table, &name, None)?])
    }
}

struct Fixture {
    _plugins: PluginDir,
    root: tempfile::TempDir,
    catalog: Catalog,
}

impl Fixture {
    fn new(mode: &[&str]) -> Self {
        let plugins = PluginDir::new();
        plugins.manifest(
            "scale.json",
            "Scale",
            mode,
            "scale",
            json!([["factor", "Factor", "float", false, 2.0]]),
        );
        let implementations = Implementations::new().with(
            "scale",
            Capability::transformer(|init| Ok(Scale { init, table: None })),
        );
        let catalog = Registry::with_manifests(Arc::new(implementations))
            .discover(plugins.path(), &ModeFilter::All)
            .unwrap();
        Self {
            _plugins: plugins,
            root: tempfile::tempdir().unwrap(),
            catalog,
        }
    }

    fn engine(&self) -> EngineConfig {
        EngineConfig::new().with_output_roots(self.root.path().join("pre"), self.root.path().join("post"))
    }

    fn input(&self, cooldown: &str, name: &str) -> PathBuf {
        let path = self.root.path().join("raw").join(cooldown).join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "# header\nt\tV\n0\t1\n1\t-2\n").unwrap();
        path
    }

    fn store() -> Arc<dyn TableStore> {
        Arc::new(AutoTableStore)
    }
}

fn read(path: &Path) -> Table {
    AutoTableStore.read(path).unwrap()
}

#[test]
fn run_config_writes_under_mode_root_and_dataset() {
    let fx = Fixture::new(&["post", "pre"]);
    let input = fx.input("cd1", "run.dat");
    let config = ValueTree::new()
        .with("module", "Scale")
        .with("input_file", input.to_string_lossy().into_owned());

    let written = run_config(&config, None, &fx.catalog, &fx.engine(), Fixture::store()).unwrap();

    let expected = fx.root.path().join("post/cd1/run_scaled.json");
    assert_eq!(written, vec![expected.clone()]);
    assert_eq!(read(&expected).column("V"), Some(&[2.0, -4.0][..]));
}

#[test]
fn explicit_cooldown_and_input_override() {
    let fx = Fixture::new(&["pre"]);
    let input = fx.input("cd1", "run.dat");
    let config = ValueTree::new()
        .with("module", "Scale")
        .with("input_file", "/ignored.dat")
        .with("cooldown", "manual")
        .with("factor", 3.0);

    let written = run_config(&config, Some(input.as_path()), &fx.catalog, &fx.engine(), Fixture::store()).unwrap();

    assert_eq!(written, vec![fx.root.path().join("pre/manual/run_scaled.json")]);
    assert_eq!(read(&written[0]).column("V"), Some(&[3.0, -6.0][..]));
}

#[test]
fn untagged_module_defaults_to_pre() {
    let fx = Fixture::new(&[]);
    let input = fx.input("cd2", "x.dat");
    let config = ValueTree::new().with("module", "scale");

    let written = run_config(&config, Some(input.as_path()), &fx.catalog, &fx.engine(), Fixture::store()).unwrap();
    assert!(written[0].starts_with(fx.root.path().join("pre/cd2")));
}

#[test]
fn run_config_requires_module_and_input() {
    let fx = Fixture::new(&["post"]);
    let engine = fx.engine();

    let err = run_config(&ValueTree::new(), None, &fx.catalog, &engine, Fixture::store()).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let config = ValueTree::new().with("module", "Scale");
    let err = run_config(&config, None, &fx.catalog, &engine, Fixture::store()).unwrap_err();
    assert!(err.to_string().contains("input_file"), "{err}");

    let config = ValueTree::new().with("module", "Nope").with("input_file", "x.dat");
    let err = run_config(&config, None, &fx.catalog, &engine, Fixture::store()).unwrap_err();
    assert!(matches!(err, EngineError::Resolution(_)));
}

#[test]
fn unknown_mode_has_no_output_root() {
    let fx = Fixture::new(&["plot"]);
    let input = fx.input("cd1", "run.dat");
    let config = ValueTree::new().with("module", "Scale");

    let err = run_config(&config, Some(input.as_path()), &fx.catalog, &fx.engine(), Fixture::store()).unwrap_err();
    assert!(err.to_string().contains("unknown module mode 'plot'"), "{err}");
}

#[test]
fn failing_stage_aborts_before_persist() {
    let fx = Fixture::new(&["post"]);
    let input = fx.input("cd1", "run.dat");
    let config = ValueTree::new().with("module", "Scale").with("factor", -1.0);

    let err = run_config(&config, Some(input.as_path()), &fx.catalog, &fx.engine(), Fixture::store()).unwrap_err();

    let EngineError::Stage(stage) = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(stage.stage, Stage::Process);
    assert_eq!(stage.module, "Scale");
    assert!(!fx.root.path().join("post").exists());
}

#[test]
fn bad_parameter_type_fails_validation() {
    let fx = Fixture::new(&["post"]);
    let input = fx.input("cd1", "run.dat");
    let config = ValueTree::new().with("module", "Scale").with("factor", "lots");

    let err = run_config(&config, Some(input.as_path()), &fx.catalog, &fx.engine(), Fixture::store()).unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }), "{err}");
}

#[test]
fn batch_continues_past_failures() {
    let fx = Fixture::new(&["post"]);
    let good = fx.input("cd1", "good.dat");
    let missing = fx.root.path().join("raw/cd1/missing.dat");
    let descriptor = fx.catalog.get("Scale").unwrap();
    let out = fx.root.path().join("post");

    let report = run_batch(
        descriptor,
        &[missing.clone(), good],
        &out,
        &ValueTree::new(),
        &Fixture::store(),
    );

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, missing);
    assert!(matches!(&report.failed[0].1, EngineError::Stage(s) if s.stage == Stage::Load));
    assert_eq!(report.written().collect::<Vec<_>>(), vec![out.join("cd1/good_scaled.json").as_path()]);
}
