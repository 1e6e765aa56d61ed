//! Integration tests for config-driven runs
//!
//! Loads `stylefix.toml` from disk and wires its settings through a report
//! provider and the orchestrator, the way the CLI does.

use std::fs;
use std::path::PathBuf;
use stylefix::config::{load_from_path, load_or_default, ConfigError, ValidationIssue, CONFIG_FILE_NAME};
use stylefix::{FixOptions, Newline, OffsetEncoding, Orchestrator, ReportProvider, RuleTable, ViolationKind};
use tempfile::TempDir;

fn setup_test_workspace(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), config).unwrap();
    dir
}

#[test]
fn test_root_is_relative_to_config_file() {
    let dir = setup_test_workspace("[workspace]\nroot = \"src\"\n");
    let config = load_from_path(dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config.root(dir.path()), dir.path().join("src"));

    let config = load_or_default(dir.path()).unwrap();
    assert_eq!(config.workspace.root, Some(PathBuf::from("src")));
}

#[test]
fn test_invalid_kind_reports_file() {
    let dir = setup_test_workspace("[rules]\nkinds = [\"SA1028\", \"no-such-rule\"]\n");
    let err = load_from_path(dir.path().join(CONFIG_FILE_NAME)).unwrap_err();

    match &err {
        ConfigError::Validation { path, source } => {
            assert!(path.as_ref().unwrap().ends_with(CONFIG_FILE_NAME));
            assert_eq!(source.issues, vec![ValidationIssue::UnknownKind("no-such-rule".into())]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_catalog_requirement() {
    let dir = setup_test_workspace("[meta]\ncatalog = \">=nope\"\n");
    let err = load_from_path(dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
    assert!(err.to_string().contains("meta.catalog"));
}

#[test]
fn test_config_drives_run() {
    let dir = setup_test_workspace(
        r#"[workspace]
root = "src"

[rules]
kinds = ["blank-line-after-closing-brace", "SA1028"]
newline = "crlf"
offsets = "utf16"
"#,
    );
    let config = load_from_path(dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config.rules.newline, Newline::Crlf);
    assert_eq!(config.rules.offsets, OffsetEncoding::Utf16);

    let root = config.root(dir.path());
    // "é" is one UTF-16 unit; whitespace starts at unit 7, byte 8
    fs::write(root.join("A.cs"), "// café  \r\nif (a) { }\r\nreturn;\r\n").unwrap();
    fs::write(
        root.join("report.json"),
        r#"[
  {"id": "SA1028", "path": "A.cs", "start": 7, "end": 9},
  {"id": "SA1005", "path": "A.cs", "start": 0, "end": 7}
]"#,
    )
    .unwrap();

    let provider = ReportProvider::load(root.join("report.json"), &root).unwrap();
    let table = RuleTable::standard(config.rules.newline);
    let report = Orchestrator::new(&table, provider)
        .with_options(FixOptions {
            kinds: config.kinds(),
            offsets: config.rules.offsets,
            ..FixOptions::default()
        })
        .fix_all();

    assert!(!report.has_failures());
    // SA1005 is not selected; only whitespace goes
    assert_eq!(
        report.kinds.iter().map(|k| k.kind).collect::<Vec<_>>(),
        vec![ViolationKind::TrailingWhitespace, ViolationKind::BlankLineAfterClosingBrace]
    );
    assert_eq!(
        fs::read_to_string(root.join("A.cs")).unwrap(),
        "// café\r\nif (a) { }\r\nreturn;\r\n"
    );
}
