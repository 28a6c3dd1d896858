//! Pipeline application against discovered mutators

use std::sync::Arc;

use datalab_core::{EngineError, Pipeline, PipelineError};
use datalab_plugin::Implementations;
use datalab_registry::{ModeFilter, Registry};
use datalab_schema::ValueTree;
use datalab_test_utils::{abc_implementations, empty_capability, sample_table, PluginDir, Probe};
use pretty_assertions::assert_eq;
use serde_json::json;

fn abc_dir() -> PluginDir {
    let dir = PluginDir::new();
    dir.manifest("a.json", "A", &[], "a", json!([]));
    dir.manifest("b.json", "B", &[], "b", json!([]));
    dir.manifest("c.json", "C", &[], "c", json!([]));
    dir
}

fn steps(names: &[&str]) -> Pipeline {
    names
        .iter()
        .fold(Pipeline::new(), |p, name| p.with_step(*name, ValueTree::new()))
}

#[test]
fn failing_middle_step_stops_the_pipeline() {
    let dir = abc_dir();
    let (implementations, [a, b, c]) = abc_implementations();
    let registry = Registry::with_manifests(Arc::new(implementations));
    let initial = sample_table();

    let err = steps(&["A", "B", "C"])
        .apply(&initial, &registry, dir.path())
        .unwrap_err();

    assert_eq!(err.position(), Some(2));
    assert_eq!(err.module(), Some("B"));
    assert!(err.to_string().contains("step 2 ('B')"), "{err}");
    assert!(err.to_string().contains("b exploded"), "{err}");

    assert_eq!(a.calls(), 1);
    assert_eq!(b.inputs()[0].column("V"), Some(&[2.0, 4.0, 3.0, 6.0][..]));
    assert_eq!(c.calls(), 0);
    assert_eq!(initial, sample_table());
}

#[test]
fn steps_compose_in_order() {
    let dir = abc_dir();
    let (implementations, [_, _, c]) = abc_implementations();
    let registry = Registry::with_manifests(Arc::new(implementations));

    let out = steps(&["A", "C"]).apply(&sample_table(), &registry, dir.path()).unwrap();

    assert_eq!(out.column("V"), Some(&[102.0, 104.0, 103.0, 106.0][..]));
    assert_eq!(c.inputs()[0].column("V"), Some(&[2.0, 4.0, 3.0, 6.0][..]));
}

#[test]
fn empty_pipeline_is_identity_without_discovery() {
    let registry = Registry::with_manifests(Arc::new(Implementations::new()));
    let out = Pipeline::new()
        .apply(&sample_table(), &registry, std::path::Path::new("/no/such/dir"))
        .unwrap();
    assert_eq!(out, sample_table());
}

#[test]
fn unknown_module_is_fatal_before_anything_runs() {
    let dir = abc_dir();
    let (implementations, [a, ..]) = abc_implementations();
    let registry = Registry::with_manifests(Arc::new(implementations));

    let err = steps(&["A", "Missing"])
        .apply(&sample_table(), &registry, dir.path())
        .unwrap_err();

    let EngineError::Pipeline(PipelineError::Step { position, source, .. }) = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(*position, 2);
    assert!(matches!(**source, EngineError::Resolution(_)));
    assert!(err.is_recoverable());
    assert_eq!(a.calls(), 0);
}

#[test]
fn step_without_value_is_an_error() {
    let dir = PluginDir::new();
    dir.manifest("e.json", "Empty", &[], "empty", json!([]));
    let probe = Probe::new();
    let registry = Registry::with_manifests(Arc::new(
        Implementations::new().with("empty", empty_capability(&probe)),
    ));

    let err = steps(&["Empty"]).apply(&sample_table(), &registry, dir.path()).unwrap_err();
    assert!(err.to_string().contains("step produced no value"), "{err}");
    assert!(!err.is_recoverable());
    assert_eq!(probe.calls(), 1);
}

#[test]
fn parameters_are_validated_against_the_schema() {
    let dir = PluginDir::new();
    dir.manifest("a.json", "A", &[], "a", json!([["x_column", "X", "dropdown_column", true]]));
    let (implementations, [a, ..]) = abc_implementations();
    let registry = Registry::with_manifests(Arc::new(implementations));
    let catalog = registry.discover(dir.path(), &ModeFilter::All).unwrap();

    let err = steps(&["A"]).validate_against(&catalog).unwrap_err();
    assert!(err.to_string().contains("X is required"), "{err}");

    let ok = Pipeline::new().with_step("A", ValueTree::new().with("x_column", "V"));
    assert!(ok.validate_against(&catalog).is_ok());
    assert_eq!(a.calls(), 0);
}

#[test]
fn each_application_rediscovers() {
    let dir = abc_dir();
    let (implementations, _) = abc_implementations();
    let registry = Registry::with_manifests(Arc::new(implementations));
    let pipeline = steps(&["A"]);

    let first = pipeline.apply(&sample_table(), &registry, dir.path()).unwrap();
    dir.manifest("a.json", "A", &[], "c", json!([]));
    let second = pipeline.apply(&sample_table(), &registry, dir.path()).unwrap();

    assert_eq!(first.column("V").unwrap()[0], 2.0);
    assert_eq!(second.column("V").unwrap()[0], 101.0);
}
