//! End-to-end tests against the real `ptx` binary via `assert_cmd`.

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn list_on_empty_registry_prints_empty_table() {
    let workdir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "list"])
        .assert()
        .success();
}

#[test]
fn init_scaffolds_a_manifest() {
    let workdir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "init", "demo"])
        .assert()
        .success()
        .stdout(contains("scaffolded plugin manifest"));

    assert!(workdir.path().join("plugin.json").exists());
}

#[test]
fn init_refuses_to_overwrite_existing_manifest() {
    let workdir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "init", "demo"])
        .assert()
        .success();

    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "init", "demo"])
        .assert()
        .failure();
}

#[test]
fn doctor_reports_clean_state_when_no_registry_exists() {
    let workdir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "doctor"])
        .assert()
        .success()
        .stdout(contains("nothing to check"));
}

#[test]
fn doctor_rejects_corrupt_registry_file() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::write(workdir.path().join("registry.json"), b"not json").unwrap();

    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "doctor"])
        .assert()
        .failure();
}

#[test]
fn helper_list_on_empty_dir_reports_none_found() {
    let workdir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["helper", "list"])
        .assert()
        .success();
}

#[test]
fn start_unknown_plugin_fails_with_not_found() {
    let workdir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ptx")
        .unwrap()
        .current_dir(workdir.path())
        .args(["plugin", "start", "ghost"])
        .assert()
        .failure()
        .stderr(contains("not known"));
}
