//! The bundled class descriptions and the `epa` binary.

use epa_cli::ClassDescription;
use epa_model::ActionSet;
use epa_query::Translator;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn demo_files() -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(demos_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

#[test]
fn bundled_descriptions_are_valid() {
    let files = demo_files();
    assert!(!files.is_empty());
    for path in files {
        let desc = ClassDescription::load(&path).unwrap();
        let class = desc.class_model();
        let actions = ActionSet::extract(&class)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let translator = desc.translator().unwrap();
        let base = translator.base_translation(&class);
        for action in actions.actions() {
            let procedure = translator.procedure_name(action.operation());
            assert!(
                base.contains(&format!("procedure {procedure}(")),
                "{}: no procedure for {action}",
                path.display()
            );
        }
        let initial = desc.initial_state(&actions).unwrap();
        assert!(!initial.is_empty(), "{}", path.display());
    }
}

#[test]
fn door_has_two_actions() {
    let desc = ClassDescription::load(&demos_dir().join("door.json")).unwrap();
    let actions = ActionSet::extract(&desc.class_model()).unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(desc.initial_state(&actions).unwrap().to_string(), "{open()}");
}

#[test]
fn static_helpers_are_not_actions() {
    let desc = ClassDescription::load(&demos_dir().join("bounded_stack.json")).unwrap();
    let actions = ActionSet::extract(&desc.class_model()).unwrap();
    assert!(actions.find("push").is_some());
    assert!(actions.find("pop").is_some());
    assert!(actions.find("capacity").is_none());
}

#[test]
fn actions_command_lists_actions() {
    let output = Command::new(env!("CARGO_BIN_EXE_epa"))
        .arg("actions")
        .arg(demos_dir().join("door.json"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("class Door"));
    assert!(stdout.contains("open()"));
    assert!(stdout.contains("close()"));
    assert!(stdout.contains("initial state: {open()}"));
}

#[test]
fn invalid_class_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(
        &path,
        r#"{
            "class": "Broken",
            "operations": [
                { "qualified_name": "Broken#go" },
                { "qualified_name": "Broken#go_pre", "return_type": "bool" }
            ],
            "fragments": { "Broken#go": "", "Broken#go_pre": "" }
        }"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_epa"))
        .arg("actions")
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid class"));
}

#[test]
fn missing_file_exits_with_failure() {
    let output = Command::new(env!("CARGO_BIN_EXE_epa"))
        .args(["construct", "/nonexistent/class.json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

fn construct_without_corral(rust_log: Option<&str>) -> String {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_epa"));
    cmd.arg("construct")
        .arg(demos_dir().join("door.json"))
        .args(["--corral", "/nonexistent/corral", "--workers", "1", "--verbose"]);
    match rust_log {
        Some(directives) => cmd.env("RUST_LOG", directives),
        None => cmd.env_remove("RUST_LOG"),
    };
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn verbose_logs_debug_events() {
    let stdout = construct_without_corral(None);
    assert!(stdout.contains("invoking Corral"));
}

#[test]
fn rust_log_takes_precedence_over_verbose() {
    let stdout = construct_without_corral(Some("error"));
    assert!(!stdout.contains("invoking Corral"));
    assert!(!stdout.contains("actions extracted"));
}
