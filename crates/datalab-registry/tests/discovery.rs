//! Discovery over real plugin directories

use std::sync::Arc;

use datalab_plugin::{CapabilityKind, Implementations};
use datalab_registry::{LoadError, ModeFilter, Registry, RegistryConfig};
use datalab_test_utils::{abc_implementations, PluginDir};
use pretty_assertions::assert_eq;
use serde_json::json;

fn registry() -> Registry {
    let (implementations, _) = abc_implementations();
    Registry::with_manifests(Arc::new(implementations))
}

#[test]
fn one_good_and_one_failing_unit() {
    let dir = PluginDir::new();
    dir.manifest("good.json", "Good", &["post"], "a", json!([]));
    dir.write("broken.json", "{ not json");

    let catalog = registry().discover(dir.path(), &ModeFilter::All).unwrap();

    assert_eq!(catalog.names(), vec!["Good"]);
    assert_eq!(catalog.skipped().len(), 1);
    assert!(catalog.skipped()[0].path().ends_with("broken.json"));
    assert!(matches!(catalog.skipped()[0].source, LoadError::Parse { .. }));
}

#[test]
fn default_of_the_wrong_kind_skips_the_unit() {
    let dir = PluginDir::new();
    dir.manifest("good.json", "Good", &[], "a", json!([["window_length", "Window", "int", false, 11]]));
    dir.manifest("bad.json", "Bad", &[], "b", json!([["window_length", "Window", "int", false, "wide"]]));

    let catalog = registry().discover(dir.path(), &ModeFilter::All).unwrap();

    assert_eq!(catalog.names(), vec!["Good"]);
    assert_eq!(catalog.skipped().len(), 1);
    assert!(catalog.skipped()[0].path().ends_with("bad.json"));
    assert!(matches!(catalog.skipped()[0].source, LoadError::Schema { .. }));
}

#[test]
fn rediscovery_reflects_schema_edits() {
    let dir = PluginDir::new();
    dir.manifest("m.json", "M", &["post"], "a", json!([["x", "X", "float", false]]));
    let registry = registry();

    let before = registry.discover(dir.path(), &ModeFilter::All).unwrap();
    dir.manifest(
        "m.json",
        "M",
        &["post"],
        "a",
        json!([["x", "X", "float", false], ["y_%d", "Y", "int", true]]),
    );
    let after = registry.discover(dir.path(), &ModeFilter::All).unwrap();

    let (old, new) = (before.get("M").unwrap(), after.get("M").unwrap());
    assert_eq!(old.schema.fields().len(), 1);
    assert_eq!(new.schema.fields().len(), 2);
    assert_ne!(old.fingerprint, new.fingerprint);
}

#[test]
fn reserved_prefix_and_foreign_files_are_ignored() {
    let dir = PluginDir::new();
    dir.manifest("__init__.json", "Hidden", &["post"], "a", json!([]));
    dir.manifest("shown.json", "Shown", &["post"], "a", json!([]));
    dir.write("notes.md", "# not a plugin");
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let catalog = registry().discover(dir.path(), &ModeFilter::All).unwrap();
    assert_eq!(catalog.names(), vec!["Shown"]);
    assert!(catalog.skipped().is_empty());

    let custom = registry().with_config(RegistryConfig::default().with_reserved_prefix("sh"));
    let catalog = custom.discover(dir.path(), &ModeFilter::All).unwrap();
    assert_eq!(catalog.names(), vec!["Hidden"]);
}

#[test]
fn mode_filter_selects_by_tag() {
    let dir = PluginDir::new();
    dir.manifest("a.json", "Pre", &["pre"], "a", json!([]));
    dir.manifest("b.json", "Both", &["pre", "post"], "a", json!([]));
    dir.write("c.json", r#"{"name": "Untagged", "entry": "a"}"#);
    let registry = registry();

    let post = registry.discover(dir.path(), &ModeFilter::tag("post")).unwrap();
    assert_eq!(post.names(), vec!["Both"]);

    let pre = registry.discover(dir.path(), &"pre".parse().unwrap()).unwrap();
    assert_eq!(pre.names(), vec!["Pre", "Both"]);

    let all = registry.discover(dir.path(), &ModeFilter::All).unwrap();
    assert_eq!(all.names(), vec!["Pre", "Both", "Untagged"]);
}

#[test]
fn display_names_fall_back_to_stem_and_symbol() {
    let dir = PluginDir::new();
    dir.write("lonely.yaml", "entry: a\n");
    dir.write(
        "visuals.yaml",
        "mode: plot\ntypes:\n  - {symbol: First, entry: a}\n  - {symbol: Second, entry: c, name: Named}\n",
    );

    let catalog = registry().discover(dir.path(), &ModeFilter::All).unwrap();
    assert_eq!(catalog.names(), vec!["lonely", "visuals.First", "Named"]);
    assert_eq!(catalog.get("Named").unwrap().mode_tags, vec!["plot".to_string()]);
    assert_eq!(catalog.get("Second").unwrap().display_name, "Named");
}

#[test]
fn type_schema_wins_over_unit_schema() {
    let dir = PluginDir::new();
    dir.write(
        "m.json",
        r#"{"schema": [["u", "U", "str", false]],
            "types": [{"symbol": "T", "entry": "a", "name": "T", "schema": [["t", "T", "str", false]]},
                      {"symbol": "S", "entry": "c", "name": "S"}]}"#,
    );

    let catalog = registry().discover(dir.path(), &ModeFilter::All).unwrap();
    assert!(catalog.get("T").unwrap().schema.find("t").is_some());
    assert!(catalog.get("S").unwrap().schema.find("u").is_some());
    assert_eq!(catalog.get("S").unwrap().kind(), CapabilityKind::Mutator);
}

#[test]
fn duplicate_names_keep_first() {
    let dir = PluginDir::new();
    dir.manifest("a_first.json", "Same", &["post"], "a", json!([]));
    dir.manifest("b_second.json", "Same", &["post"], "c", json!([]));

    let catalog = registry().discover(dir.path(), &ModeFilter::All).unwrap();

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("Same").unwrap().symbol, "a");
    assert_eq!(catalog.collisions().len(), 1);
    assert!(catalog.collisions()[0].ignored.ends_with("b_second.json"));
}

#[test]
fn missing_directory_is_empty() {
    let registry = Registry::with_manifests(Arc::new(Implementations::new()));
    let catalog = registry
        .discover(std::path::Path::new("/definitely/not/here"), &ModeFilter::All)
        .unwrap();
    assert!(catalog.is_empty());
}

#[test]
fn removed_unit_disappears_on_rediscovery() {
    let dir = PluginDir::new();
    dir.manifest("a.json", "A", &["post"], "a", json!([]));
    dir.manifest("c.json", "C", &["post"], "c", json!([]));
    let registry = registry();
    assert_eq!(registry.discover(dir.path(), &ModeFilter::All).unwrap().len(), 2);

    dir.remove("a.json");

    let catalog = registry.discover(dir.path(), &ModeFilter::All).unwrap();
    assert_eq!(catalog.names(), vec!["C"]);
}
