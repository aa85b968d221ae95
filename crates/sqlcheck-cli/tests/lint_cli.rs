//! End-to-end tests for the sqlcheck binary.

use std::fs;
use std::process::Command;

fn sqlcheck() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sqlcheck"))
}

#[test]
fn clean_file_exits_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("clean.sql");
    fs::write(&path, "SELECT a.id FROM a;\n").expect("write");

    let output = sqlcheck().arg(&path).output().expect("run");
    assert!(output.status.success(), "stderr: {:?}", output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no issues found"));
}

#[test]
fn violations_exit_one_and_name_the_rule() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.sql");
    fs::write(&path, "SELECT id FROM a JOIN b ON a.k = b.k;\n").expect("write");

    let output = sqlcheck().arg(&path).output().expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[unqualified-column]"));
}

#[test]
fn json_format_emits_report_shape() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.sql");
    fs::write(&path, "SELECT id FROM a JOIN b ON a.k = b.k;\n").expect("write");

    let output = sqlcheck()
        .arg("--format")
        .arg("json")
        .arg(&path)
        .output()
        .expect("run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let reports: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert!(reports[0]["filePath"].is_string());
    assert_eq!(reports[0]["diagnostics"][0]["data"]["ruleId"], "unqualified-column");
}

#[test]
fn fix_rewrites_the_file_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fixme.sql");
    fs::write(&path, "select a.x from a").expect("write");

    let output = sqlcheck().arg("--fix").arg(&path).output().expect("run");
    assert!(output.status.success(), "stderr: {:?}", output.stderr);
    let fixed = fs::read_to_string(&path).expect("read back");
    assert_eq!(fixed, "SELECT a.x FROM a;");
}

#[test]
fn disable_silences_a_rule() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.sql");
    fs::write(&path, "SELECT id FROM a JOIN b ON a.k = b.k;\n").expect("write");

    let output = sqlcheck()
        .arg("--disable")
        .arg("unqualified-column")
        .arg(&path)
        .output()
        .expect("run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("[unqualified-column]"));
}

#[test]
fn unknown_disabled_rule_is_a_config_error() {
    let output = sqlcheck()
        .arg("--disable")
        .arg("no-such-rule")
        .arg("whatever.sql")
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(66));
}

#[test]
fn list_rules_prints_the_catalog() {
    let output = sqlcheck().arg("--list-rules").output().expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("implicit-join"));
    assert!(stdout.contains("cross-database-transaction"));
}
