//! Tests for the `schemeflip` binary's offline subcommands

use assert_cmd::Command;
use predicates::prelude::*;
use schemeflip::data::{AppStateStore, Database};
use schemeflip::store::OVERRIDE_KEY;
use tempfile::TempDir;

fn schemeflip(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("schemeflip").unwrap();
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

fn seed(dir: &TempDir, overrides: &str) {
    let db = Database::open(dir.path().join("schemeflip.db")).unwrap();
    AppStateStore::new(db.connection())
        .set(OVERRIDE_KEY, overrides)
        .unwrap();
}

#[test]
fn test_status_empty() {
    let dir = TempDir::new().unwrap();

    schemeflip(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No overrides"));

    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_status_lists_overrides() {
    let dir = TempDir::new().unwrap();
    seed(&dir, r#"{"2":"dark","10":"light"}"#);

    schemeflip(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("tab 2: dark").and(predicate::str::contains("tab 10: light")));
}

#[test]
fn test_clear_one_tab() {
    let dir = TempDir::new().unwrap();
    seed(&dir, r#"{"2":"dark","10":"light"}"#);

    schemeflip(&dir)
        .args(["clear", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared override of tab 2"));

    schemeflip(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("tab 2").not().and(predicate::str::contains("tab 10: light")));
}

#[test]
fn test_clear_missing_tab() {
    let dir = TempDir::new().unwrap();

    schemeflip(&dir)
        .args(["clear", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tab 4 has no override"));
}

#[test]
fn test_clear_all() {
    let dir = TempDir::new().unwrap();
    seed(&dir, r#"{"2":"dark"}"#);

    schemeflip(&dir)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared all overrides"));

    schemeflip(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No overrides"));
}

#[test]
fn test_clear_rejects_bad_tab() {
    let dir = TempDir::new().unwrap();

    schemeflip(&dir).args(["clear", "nope"]).assert().failure();
}
