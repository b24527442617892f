use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_vistoria_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("vistoria")
}

#[test]
fn test_check_command_help() {
    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("check").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("validate scenario files"));
}

#[test]
fn test_check_accepts_valid_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("good.json");
    std::fs::write(
        &path,
        r#"{
            "name": "good",
            "base_url": "http://localhost:8080",
            "steps": [{"step": "goto", "url": "index.html"}]
        }"#,
    )
    .unwrap();

    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("check").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("good"))
        .stdout(predicate::str::contains("1 step(s)"));
}

#[test]
fn test_check_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "not json at all").unwrap();

    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("check").arg(&path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed validation"));
}

#[test]
fn test_check_rejects_semantic_problems() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relative.json");
    std::fs::write(
        &path,
        r#"{"name": "relative", "steps": [{"step": "goto", "url": "index.html"}]}"#,
    )
    .unwrap();

    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("check").arg(&path);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("requires base_url"));
}

#[test]
fn test_check_validates_shipped_scenarios() {
    // The scenarios shipped in the repository must always parse.
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("scenarios");

    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("check");
    for entry in std::fs::read_dir(&dir).unwrap() {
        cmd.arg(entry.unwrap().path());
    }

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("overdue-bills"))
        .stdout(predicate::str::contains("what-if-projections-toggle"));
}
