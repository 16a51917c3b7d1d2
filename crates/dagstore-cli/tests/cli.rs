//! End-to-end tests of the `dagstore` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn dagstore(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dagstore").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env("RUST_LOG", "warn")
        .env_remove("DAGSTORE_CONFIG")
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn seed(dir: &Path) {
    for key in ["fetch", "build", "test"] {
        dagstore(dir)
            .args(["add-vertex", "--key", key])
            .assert()
            .success()
            .stdout(format!("{key}\n"));
    }
    dagstore(dir).args(["add-edge", "fetch", "build"]).assert().success();
    dagstore(dir).args(["add-edge", "build", "test"]).assert().success();
}

#[test]
fn test_graph_persists_between_invocations() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    dagstore(dir.path())
        .args(["path", "fetch", "test"])
        .assert()
        .success()
        .stdout("fetch -> build -> test\n");
    dagstore(dir.path())
        .arg("roots")
        .assert()
        .success()
        .stdout("fetch\n");
    dagstore(dir.path())
        .args(["descendants", "fetch"])
        .assert()
        .success()
        .stdout("build\ntest\n");
    dagstore(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout("fetch -> [build]\nbuild -> [test]\ntest -> []\n");
}

#[test]
fn test_cycle_is_refused() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    dagstore(dir.path())
        .args(["add-edge", "test", "fetch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
    dagstore(dir.path())
        .args(["is-edge", "test", "fetch"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn test_get_vertex_payload() {
    let dir = tempdir().unwrap();
    dagstore(dir.path())
        .args(["add-vertex", "--payload", r#"{"_key":"lint","cmd":"clippy"}"#])
        .assert()
        .success()
        .stdout("lint\n");
    dagstore(dir.path())
        .args(["get-vertex", "lint"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""cmd": "clippy""#));
}

#[test]
fn test_missing_vertex_fails() {
    let dir = tempdir().unwrap();
    dagstore(dir.path())
        .args(["get-vertex", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_config_file_sets_depth_ceiling() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[traversal]\nmax_depth = 1\n").unwrap();
    seed(dir.path());

    dagstore(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Max depth: 1"));
    dagstore(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["path", "fetch", "test"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("depth"));
}

#[test]
fn test_config_command_prints_effective_config() {
    let dir = tempdir().unwrap();
    dagstore(dir.path())
        .arg("config")
        .env("DAGSTORE_TRAVERSAL__MAX_DEPTH", "42")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_depth = 42"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempdir().unwrap();
    dagstore(dir.path())
        .args(["--config", "absent.toml", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
