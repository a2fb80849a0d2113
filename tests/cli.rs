//! `layercfg` command-line tests.

use serde_json::{json, Value};
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn layercfg(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_layercfg"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run layercfg")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Temp dir with a global and a user document plus a manifest naming both.
fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("global.json"), r#"{"theme": "light", "scale": 1}"#).unwrap();
    fs::write(dir.path().join("user.json"), r#"{"scale": 2}"#).unwrap();
    fs::write(
        dir.path().join("layers.toml"),
        "global = \"global.json\"\nuser = \"user.json\"\n",
    )
    .unwrap();
    dir
}

fn manifest(dir: &TempDir) -> String {
    dir.path().join("layers.toml").to_string_lossy().to_string()
}

#[test]
fn test_show_merged() {
    let dir = fixture();
    let output = layercfg(&["show", "--manifest", &manifest(&dir)]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"theme": "light", "scale": 2}));
}

#[test]
fn test_get_defaults_to_global() {
    let dir = fixture();
    let output = layercfg(&["get", "scale", "--manifest", &manifest(&dir)]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!(1));
}

#[test]
fn test_get_missing_exits_2() {
    let dir = fixture();
    let output = layercfg(&["get", "nope", "-l", "merged", "--manifest", &manifest(&dir)]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_set_writes_user_document() {
    let dir = fixture();
    let output = layercfg(&["set", "window.width", "1024", "--manifest", &manifest(&dir)]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let written: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("user.json")).unwrap()).unwrap();
    assert_eq!(written, json!({"scale": 2, "window": {"width": 1024}}));
}

#[test]
fn test_set_conflict_fails() {
    let dir = fixture();
    let output = layercfg(&["set", "theme.name", "dark", "--manifest", &manifest(&dir)]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("PATH_CONFLICT"));
    let user = fs::read_to_string(dir.path().join("user.json")).unwrap();
    assert_eq!(user, r#"{"scale": 2}"#);
}

#[test]
fn test_set_without_document_path_fails() {
    let dir = fixture();
    let output = layercfg(&["set", "x", "1", "-l", "project", "--manifest", &manifest(&dir)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no document path"));
}

#[test]
fn test_unset_restores_global() {
    let dir = fixture();
    let output = layercfg(&["unset", "scale", "--manifest", &manifest(&dir)]);
    assert!(output.status.success());

    let output = layercfg(&["get", "scale", "-l", "merged", "--manifest", &manifest(&dir)]);
    assert_eq!(stdout_json(&output), json!(1));
}

#[test]
fn test_which_lists_levels() {
    let dir = fixture();
    let output = layercfg(&["which", "scale", "--manifest", &manifest(&dir)]);
    let text = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("global"));
    assert!(lines[1].starts_with("user"));
}

#[test]
fn test_level_flags_override_manifest() {
    let dir = fixture();
    let project = dir.path().join("project.json");
    fs::write(&project, r#"{"scale": 3}"#).unwrap();

    let output = layercfg(&[
        "get",
        "scale",
        "-l",
        "merged",
        "--manifest",
        &manifest(&dir),
        "--project",
        &project.to_string_lossy(),
    ]);
    assert_eq!(stdout_json(&output), json!(3));
}

#[test]
fn test_state_json() {
    let dir = fixture();
    let output = layercfg(&["state", "--json", "--manifest", &manifest(&dir)]);
    let state = stdout_json(&output);

    assert_eq!(state["state"], 0x002 | 0x008);
    assert!(state["sources"]["global"]["digest"].is_string());
    assert!(state["sources"].get("project").is_none());
}

#[test]
fn test_broken_document_fails() {
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("global.json");
    fs::write(&global, "{broken").unwrap();

    let output = layercfg(&["show", "--global", &global.to_string_lossy()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse global config"));
}
