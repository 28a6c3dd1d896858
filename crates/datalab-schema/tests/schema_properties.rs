use datalab_schema::{
    apply, bind, collect, parse_schema, split_marker, validate, Form, Multiplicity, Scalar,
    ValueTree,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn filters_schema() -> datalab_schema::GroupSpec {
    parse_schema(&json!([
        ["filters_%d", "Filter", {"fields": [
            ["col", "Col", "dropdown_column", true],
            ["val", "Val", "float", true]
        ]}, true]
    ]))
    .unwrap()
}

fn editing_schema() -> datalab_schema::GroupSpec {
    parse_schema(&json!([
        ["x", "X", "float", false],
        ["name", "Name", "str", false],
        ["targets_%d", "Target", "dropdown_column", false],
        ["filters_%d", "Filter", {"fields": [
            ["col", "Col", "str", false],
            ["val", "Val", "float", false]
        ]}, false]
    ]))
    .unwrap()
}

fn cell() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[A-Z][a-z]{0,4}", "-?[0-9]{1,3}\\.[0-9]{1,2}"]
}

proptest! {
    #[test]
    fn prop_marker_strips_to_base(base in "[a-z][a-z_]{0,12}") {
        let wire = format!("{base}_%d");
        prop_assert_eq!(split_marker(&wire), (base.as_str(), Multiplicity::Repeated));
        prop_assert_eq!(split_marker(&base).1, Multiplicity::Single);
    }

    #[test]
    fn prop_marker_field_binds_to_sequence(values in proptest::collection::vec("[a-z]{1,6}", 0..5)) {
        let spec = parse_schema(&json!([["tags_%d", "Tag", "str", false]])).unwrap();
        let tree = ValueTree::new().with(
            "tags",
            values.iter().map(|v| Scalar::from(v.as_str())).collect::<Vec<_>>(),
        );

        let bound = bind(&spec, &tree).unwrap();
        prop_assert_eq!(bound.strings("tags"), values);
    }

    #[test]
    fn prop_collect_apply_is_idempotent(
        x in cell(),
        name in cell(),
        targets in proptest::collection::vec(cell(), 1..4),
        filters in proptest::collection::vec((cell(), cell()), 1..4),
    ) {
        let spec = editing_schema();
        let mut form = Form::fresh(&spec);
        form.set("x", x.as_str()).unwrap();
        form.set("name", name.as_str()).unwrap();
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                form.add_row(&spec, "targets").unwrap();
            }
            form.set_row("targets", i, target.as_str()).unwrap();
        }
        for (i, (col, val)) in filters.iter().enumerate() {
            if i > 0 {
                form.add_row(&spec, "filters").unwrap();
            }
            let instance = form.instance_mut("filters", i).unwrap();
            instance.set("col", col.as_str()).unwrap();
            instance.set("val", val.as_str()).unwrap();
        }

        let collected = collect(&spec, &form);
        let mut restored = Form::fresh(&spec);
        apply(&spec, &collected, &mut restored);

        prop_assert_eq!(collect(&spec, &restored), collected);
    }
}

#[test]
fn second_filter_missing_column_is_reported_with_index() {
    let tree = ValueTree::from_json(
        r#"{"filters": [{"col": "V", "val": 1.0}, {"col": "", "val": 2.0}]}"#,
    )
    .unwrap();

    let err = validate(&filters_schema(), &tree).unwrap_err();
    assert_eq!(err.to_string(), "Filter 2: Col is required");
}

#[test]
fn required_repeatable_group_rejects_empty_sequence() {
    let tree = ValueTree::from_json(r#"{"filters": []}"#).unwrap();

    let err = validate(&filters_schema(), &tree).unwrap_err();
    assert!(err.is_missing());
    assert_eq!(err.path.to_string(), "Filter");
}

#[test]
fn bound_tree_serializes_like_exported_config() {
    let spec = parse_schema(&json!([
        ["window_length", "Window Length", "int", false, 11],
        ["polyorder", "Polyorder", "int", false, 2]
    ]))
    .unwrap();

    let bound = bind(&spec, &ValueTree::from_json(r#"{"polyorder": "3"}"#).unwrap()).unwrap();
    assert_eq!(
        bound.to_json_value().unwrap(),
        json!({"window_length": 11, "polyorder": 3})
    );
}
