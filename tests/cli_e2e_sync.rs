//! End-to-end tests for the `repo-mirror sync` command.
//!
//! None of these reach the network: they cover argument handling and
//! configuration errors that stop a run before it starts.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_sync_help() {
    let mut cmd = cargo_bin_cmd!("repo-mirror");
    cmd.arg("sync")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--starred-repos"))
        .stdout(predicate::str::contains("--user-repos"))
        .stdout(predicate::str::contains("--user-gists"))
        .stdout(predicate::str::contains("--starred-gists"))
        .stdout(predicate::str::contains("--max-size"))
        .stdout(predicate::str::contains("--topic"))
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--redo"));
}

#[test]
fn test_sync_without_source_fails() {
    let fixture = TestFixture::new().with_config();
    fixture
        .command()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No source selected"));
}

#[test]
fn test_sync_missing_config() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["--config", "missing.ini", "sync", "--user-repos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_sync_config_without_token() {
    let fixture = TestFixture::new()
        .with_raw_config("[auth]\nusername = alice\n[options]\nrepo_dir = mirrors\n");
    fixture
        .command()
        .args(["sync", "-r"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));
}

#[test]
fn test_sync_config_from_env() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .env("REPO_MIRROR_CONFIG", fixture.path().join("elsewhere.ini"))
        .args(["sync", "-s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("elsewhere.ini"));
}

#[test]
fn test_sync_rejects_zero_workers() {
    let fixture = TestFixture::new().with_config();
    fixture
        .command()
        .args(["sync", "-s", "--workers", "0"])
        .assert()
        .failure();
}

#[test]
fn test_sync_rejects_non_numeric_max_size() {
    let fixture = TestFixture::new().with_config();
    fixture
        .command()
        .args(["sync", "-s", "--max-size", "big"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-size"));
}
