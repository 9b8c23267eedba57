use std::fs;
use std::path::{Path, PathBuf};

use meshery_registry::catalog::VersionSelector;
use meshery_registry::model::{CatalogInput, ComponentRecord, UpdateTracker};
use meshery_registry::sync::{self, RunContext};
use tempfile::tempdir;

fn write_component(root: &Path, model: &str, group: &str, name: &str, body: &str) -> PathBuf {
    let dir = root
        .join(model)
        .join(group)
        .join("v1.0.0")
        .join("components");
    fs::create_dir_all(&dir).expect("components directory");
    let path = dir.join(format!("{name}.json"));
    fs::write(&path, body).expect("component written");
    path
}

fn pod_record(shape: &str) -> ComponentRecord {
    ComponentRecord::new("meshery", "kubernetes", "Pod").with_field("shape", shape)
}

fn input_of(records: impl IntoIterator<Item = ComponentRecord>) -> CatalogInput {
    let mut input = CatalogInput::new();
    for record in records {
        input.push(record);
    }
    input
}

fn tracker(total_components: usize, total_updated: usize) -> UpdateTracker {
    UpdateTracker {
        total_components,
        total_updated,
        version: "v1.0.0".to_string(),
    }
}

#[test]
fn changed_field_is_written_and_counted() {
    let temp = tempdir().expect("temporary directory");
    let path = write_component(
        temp.path(),
        "kubernetes",
        "core",
        "Pod",
        r#"{"component":{"kind":"Pod"},"shape":"circle"}"#,
    );

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    let summary = sync::update_registry(&context, &input_of([pod_record("rectangle")]));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("component read"))
            .expect("component parsed");
    assert_eq!(
        written,
        serde_json::json!({"component": {"kind": "Pod"}, "shape": "rectangle"})
    );
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(1, 1)])
    );
    assert_eq!(
        summary.lines[0].to_string(),
        "For model kubernetes-v1.0.0, updated 1 out of 1 components."
    );
    assert_eq!(summary.total_updated, 1);
}

#[test]
fn unchanged_definition_is_left_untouched() {
    let temp = tempdir().expect("temporary directory");
    let original = r#"{"component":{"kind":"Pod"},"shape":"rectangle"}"#;
    let path = write_component(temp.path(), "kubernetes", "core", "Pod", original);
    let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok();

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    sync::update_registry(&context, &input_of([pod_record("rectangle")]));

    assert_eq!(fs::read_to_string(&path).expect("component read"), original);
    assert_eq!(fs::metadata(&path).and_then(|meta| meta.modified()).ok(), modified);
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(1, 0)])
    );
}

#[test]
fn second_run_with_same_records_updates_nothing() {
    let temp = tempdir().expect("temporary directory");
    write_component(
        temp.path(),
        "kubernetes",
        "core",
        "Pod",
        "{\n  \"component\": {\n    \"kind\": \"Pod\"\n  },\n  \"shape\": \"circle\"\n}\n",
    );
    let input = input_of([pod_record("rectangle")]);

    let first = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    assert_eq!(sync::update_registry(&first, &input).total_updated, 1);

    let second = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    assert_eq!(sync::update_registry(&second, &input).total_updated, 0);
}

#[test]
fn temporary_files_are_removed() {
    let temp = tempdir().expect("temporary directory");
    let path = write_component(
        temp.path(),
        "kubernetes",
        "core",
        "Pod",
        r#"{"component":{"kind":"Pod"},"shape":"circle"}"#,
    );
    write_component(
        temp.path(),
        "kubernetes",
        "core",
        "Service",
        r#"{"shape":"circle"}"#,
    );
    let input = input_of([
        pod_record("rectangle"),
        pod_record("rectangle"),
        ComponentRecord::new("meshery", "kubernetes", "Service").with_field("shape.inner", "x"),
    ]);

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    sync::update_registry(&context, &input);

    let components = path.parent().expect("components directory");
    let mut names: Vec<String> = fs::read_dir(components)
        .expect("components listed")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["Pod.json", "Service.json"]);
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(2, 1)])
    );
}

#[test]
fn excluded_groups_are_never_visited() {
    let temp = tempdir().expect("temporary directory");
    let body = r#"{"component":{"kind":"Pod"},"shape":"circle"}"#;
    let core = write_component(temp.path(), "kubernetes", "core", "Pod", body);
    let relationships = write_component(temp.path(), "kubernetes", "relationships", "Pod", body);
    let policies = write_component(temp.path(), "kubernetes", "policies", "Pod", body);

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    sync::update_registry(&context, &input_of([pod_record("rectangle")]));

    assert_ne!(fs::read_to_string(core).expect("core read"), body);
    assert_eq!(fs::read_to_string(relationships).expect("relationships read"), body);
    assert_eq!(fs::read_to_string(policies).expect("policies read"), body);
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(1, 1)])
    );
}

#[test]
fn missing_models_and_component_errors_do_not_abort() {
    let temp = tempdir().expect("temporary directory");
    write_component(
        temp.path(),
        "kubernetes",
        "core",
        "Pod",
        r#"{"component":{"kind":"Pod"},"shape":"circle"}"#,
    );
    write_component(temp.path(), "kubernetes", "core", "Broken", "{not json");

    let input = input_of([
        ComponentRecord::new("meshery", "istio", "Gateway").with_field("shape", "circle"),
        ComponentRecord::new("meshery", "kubernetes", "Missing").with_field("shape", "circle"),
        ComponentRecord::new("meshery", "kubernetes", "Broken").with_field("shape", "circle"),
        pod_record("rectangle"),
        ComponentRecord::new("", "kubernetes", "Pod").with_field("shape", "star"),
    ]);

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    let summary = sync::update_registry(&context, &input);

    assert_eq!(context.trackers().get("istio"), None);
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(2, 1)])
    );
    assert_eq!(summary.models, 1);
    assert_eq!(summary.total_line(), "For 1 models updated 1 components");
}

#[test]
fn every_definition_group_gets_a_tracker() {
    let temp = tempdir().expect("temporary directory");
    let body = r#"{"component":{"kind":"Pod"},"shape":"circle"}"#;
    write_component(temp.path(), "kubernetes", "v1.25.2", "Pod", body);
    write_component(temp.path(), "kubernetes", "v1.26.0", "Pod", body);
    write_component(temp.path(), "kubernetes", "v1.26.0", "Service", body);
    fs::create_dir_all(temp.path().join("kubernetes").join("empty")).expect("group created");

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    let summary = sync::update_registry(&context, &input_of([pod_record("rectangle")]));

    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(0, 0), tracker(1, 1), tracker(2, 1)])
    );
    assert_eq!(summary.lines.len(), 3);
    assert_eq!(summary.total_updated, 2);
}

#[test]
fn discovered_versions_are_each_updated() {
    let temp = tempdir().expect("temporary directory");
    let body = r#"{"component":{"kind":"Pod"},"shape":"circle"}"#;
    write_component(temp.path(), "kubernetes", "core", "Pod", body);
    let next = temp
        .path()
        .join("kubernetes")
        .join("core")
        .join("v1.1.0")
        .join("components");
    fs::create_dir_all(&next).expect("components directory");
    fs::write(next.join("Pod.json"), body).expect("component written");

    let context = RunContext::new(temp.path(), VersionSelector::Discover).expect("context");
    let summary = sync::update_registry(&context, &input_of([pod_record("rectangle")]));

    let lines: Vec<String> = summary.lines.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        [
            "For model kubernetes-v1.0.0, updated 1 out of 1 components.",
            "For model kubernetes-v1.1.0, updated 1 out of 1 components.",
        ]
    );
}

#[test]
fn invalid_catalog_root_is_fatal() {
    let temp = tempdir().expect("temporary directory");
    assert!(RunContext::new(&temp.path().join("missing"), VersionSelector::default()).is_err());
}

const GENERATED_POD: &str = r#"{
    "component": {
        "kind": "Pod"
    },
    "metadata": {
        "svgColor": "\u003csvg xmlns=\"http://www.w3.org/2000/svg\"\u003e\u003c/svg\u003e",
        "scale": 1.50
    },
    "shape": "circle"
}"#;

#[test]
fn generated_definition_survives_a_no_op_patch_byte_for_byte() {
    let temp = tempdir().expect("temporary directory");
    let path = write_component(temp.path(), "kubernetes", "core", "Pod", GENERATED_POD);

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    let summary = sync::update_registry(&context, &input_of([pod_record("circle")]));

    assert_eq!(fs::read_to_string(&path).expect("component read"), GENERATED_POD);
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(1, 0)])
    );
    assert_eq!(summary.total_updated, 0);
}

#[test]
fn rewrite_keeps_escapes_indent_and_number_text() {
    let temp = tempdir().expect("temporary directory");
    let path = write_component(temp.path(), "kubernetes", "core", "Pod", GENERATED_POD);

    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    sync::update_registry(&context, &input_of([pod_record("rectangle")]));

    assert_eq!(
        fs::read_to_string(&path).expect("component read"),
        GENERATED_POD.replace(r#""shape": "circle""#, r#""shape": "rectangle""#)
    );
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(1, 1)])
    );
}

#[test]
fn component_names_cannot_escape_the_components_directory() {
    let temp = tempdir().expect("temporary directory");
    let body = r#"{"component":{"kind":"Pod"},"shape":"circle"}"#;
    write_component(temp.path(), "kubernetes", "core", "Pod", body);
    let outside = temp.path().join("kubernetes").join("core").join("outside.json");
    fs::write(&outside, body).expect("outside file written");

    let input = input_of([
        ComponentRecord::new("meshery", "kubernetes", "../../outside").with_field("shape", "star"),
        pod_record("rectangle"),
    ]);
    let context = RunContext::new(temp.path(), VersionSelector::default()).expect("context");
    sync::update_registry(&context, &input);

    assert_eq!(fs::read_to_string(&outside).expect("outside read"), body);
    assert_eq!(
        context.trackers().get("kubernetes"),
        Some(vec![tracker(1, 1)])
    );
}
