use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_vistoria_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("vistoria")
}

#[test]
fn test_serve_command_help() {
    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("serve").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("Document root"));
}

#[test]
fn test_serve_rejects_missing_root() {
    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("serve").arg("/definitely/not/a/dir");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}
