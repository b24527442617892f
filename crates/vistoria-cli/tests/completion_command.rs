use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_vistoria_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("vistoria")
}

#[test]
fn test_completion_bash() {
    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("completion").arg("bash");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("vistoria"));
}

#[test]
fn test_completion_rejects_unknown_shell() {
    let mut cmd = Command::new(get_vistoria_bin());
    cmd.arg("completion").arg("tcsh");

    cmd.assert().failure();
}
