use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn live_tui() -> Command {
    let mut cmd = Command::cargo_bin("live-tui").expect("live-tui binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn prints_version() {
    live_tui()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    live_tui()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("LIVE-TUI"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--print-config"));
}

#[test]
fn print_config_reads_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "identity:\n  username: night.owl\nstack:\n  interval: 2s\n",
    )
    .unwrap();

    live_tui()
        .arg("--config")
        .arg(&path)
        .arg("--print-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("night.owl"))
        .stdout(predicate::str::contains("2s"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    live_tui()
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .arg("--print-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn unknown_flag_is_rejected() {
    live_tui()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument"));
}
