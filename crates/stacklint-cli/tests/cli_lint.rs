//! # CLI Lint Runs
//!
//! Drives `lint_files` and the renderers the way the binary does, with a
//! custom schema directory, a configuration file and several templates.

use std::fs;
use std::path::{Path, PathBuf};

use stacklint_cli::lint::{effective_config, lint_files, LintArgs};
use stacklint_cli::output::{exit_code, render, OutputFormat};

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, text).expect("write file");
    path
}

fn schema_dir(root: &Path) -> PathBuf {
    let dir = root.join("schemas");
    write(
        &dir,
        "all/widget.json",
        r#"{
            "typeName": "Test::Widget::Thing",
            "additionalProperties": false,
            "properties": {
                "Size": {"type": "integer", "maximum": 10},
                "Zone": {"type": "string", "cfnLint": ["AvailabilityZone"]}
            },
            "required": ["Size"]
        }"#,
    );
    write(
        &dir,
        "eu-west-1/widget.json",
        r#"{
            "typeName": "Test::Widget::Thing",
            "additionalProperties": false,
            "properties": {"Size": {"type": "integer", "maximum": 5}},
            "required": ["Size"]
        }"#,
    );
    dir
}

#[test]
fn custom_schemas_and_regions() {
    let root = tempfile::tempdir().expect("tempdir");
    let template = write(
        root.path(),
        "widget.yaml",
        "Resources:\n  W:\n    Type: Test::Widget::Thing\n    Properties:\n      Size: 8\n",
    );
    let args = LintArgs {
        templates: vec![template],
        schemas: Some(schema_dir(root.path())),
        regions: vec!["us-east-1".into(), "eu-west-1".into()],
        ..LintArgs::default()
    };
    let reports = lint_files(&args).expect("lint succeeds");
    let diagnostics = &reports[0].diagnostics;
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].rule_id, "E3038");
    assert_eq!(diagnostics[0].regions.len(), 1);
    assert_eq!(diagnostics[0].regions[0].as_str(), "eu-west-1");
    assert_eq!(exit_code(&reports), 2);
}

#[test]
fn config_file_drives_the_run() {
    let root = tempfile::tempdir().expect("tempdir");
    let config = write(root.path(), "stacklint.json", r#"{"ignore_checks": ["E3038"], "regions": ["eu-west-1"]}"#);
    let template = write(
        root.path(),
        "widget.json",
        r#"{"Resources": {"W": {"Type": "Test::Widget::Thing", "Properties": {"Size": 8, "Zone": "eu-west-1a"}}}}"#,
    );
    let args = LintArgs {
        templates: vec![template],
        schemas: Some(schema_dir(root.path())),
        config: Some(config),
        ..LintArgs::default()
    };
    assert_eq!(effective_config(&args).expect("config loads").regions.len(), 1);

    // eu-west-1 has no `Zone` property, so the only remaining finding is E3002.
    let reports = lint_files(&args).expect("lint succeeds");
    let ids: Vec<&str> = reports[0].diagnostics.iter().map(|d| d.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["E3002"]);

    let text = render(&reports, OutputFormat::Text).expect("render");
    assert!(text.contains("E3002 [error] Resources/W/Properties/Zone"));
    assert!(text.trim_end().ends_with("(eu-west-1)"));
}

#[test]
fn warnings_only_exit_code() {
    let root = tempfile::tempdir().expect("tempdir");
    let template = write(
        root.path(),
        "widget.yaml",
        "Resources:\n  W:\n    Type: Test::Widget::Thing\n    Properties:\n      Size: 1\n      Zone: us-east-1b\n",
    );
    let args = LintArgs {
        templates: vec![template],
        schemas: Some(schema_dir(root.path())),
        format: OutputFormat::Json,
        ..LintArgs::default()
    };
    let reports = lint_files(&args).expect("lint succeeds");
    assert_eq!(exit_code(&reports), 4);
    let json: serde_json::Value =
        serde_json::from_str(&render(&reports, args.format).expect("render")).expect("valid json");
    assert_eq!(json[0]["diagnostics"][0]["rule_id"], "W3010");
}

#[test]
fn malformed_schema_directory_is_fatal() {
    let root = tempfile::tempdir().expect("tempdir");
    let template = write(root.path(), "t.yaml", "Resources: {}\n");
    let schemas = root.path().join("schemas");
    write(&schemas, "not-a-region/x.json", r#"{"typeName": "A::B::C", "properties": {"X": {}}}"#);
    let args = LintArgs {
        templates: vec![template],
        schemas: Some(schemas),
        ..LintArgs::default()
    };
    let err = lint_files(&args).expect_err("bad directory");
    assert!(format!("{err:#}").contains("loading resource schemas"));
}
