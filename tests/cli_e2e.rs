//! End-to-end CLI tests for the harvester binary.

#![allow(deprecated)]

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::{cdn_url, write_tree};
use tempfile::TempDir;

/// Binary with an isolated config home so a developer's config never leaks in.
fn harvester(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("xdg-config"))
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    harvester(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Harvest media attachment links"))
        .stdout(predicate::str::contains("--max-attempts"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    harvester(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    harvester(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_dry_run_lists_urls_in_order_without_downloading() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let first = cdn_url("1/1/a.png");
    let second = cdn_url("1/2/b.gif");
    let csv = format!("x,{first}\ny,{second} {first}\n");
    write_tree(work.path(), &[("data/log.csv", csv.as_str())]);
    let output = work.path().join("image-output");

    harvester(&home)
        .arg("--source")
        .arg(work.path().join("data"))
        .arg("--output")
        .arg(&output)
        .arg("--dry-run")
        .arg("-q")
        .assert()
        .success()
        .stdout(format!("{first}\n{second}\n{first}\n"));

    assert!(!output.exists(), "dry run must not create the output directory");
}

#[test]
fn test_binary_missing_source_exits_one() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    let assert = harvester(&home)
        .arg("--source")
        .arg(work.path().join("absent"))
        .arg("--output")
        .arg(work.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_binary_empty_source_succeeds_and_writes_report() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    std::fs::create_dir_all(work.path().join("data")).unwrap();
    let report = work.path().join("report.json");

    harvester(&home)
        .arg("--source")
        .arg(work.path().join("data"))
        .arg("--output")
        .arg(work.path().join("image-output"))
        .arg("--report")
        .arg(&report)
        .arg("-q")
        .assert()
        .success();

    assert!(work.path().join("image-output").is_dir());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["urls_found"], 0);
    assert_eq!(json["cancelled"], false);
}

#[test]
fn test_binary_reads_source_from_config_file() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let url = cdn_url("7/7/from-config.png");
    write_tree(work.path(), &[("exports/chat.csv", url.as_str())]);
    let config = work.path().join("harvester.toml");
    std::fs::write(
        &config,
        format!("source = \"{}\"\n", work.path().join("exports").display()),
    )
    .unwrap();

    harvester(&home)
        .arg("--config")
        .arg(&config)
        .arg("--dry-run")
        .arg("-q")
        .assert()
        .success()
        .stdout(format!("{url}\n"));
}

#[test]
fn test_binary_rejects_bad_config_file() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let config = work.path().join("harvester.toml");
    std::fs::write(&config, "throttle = 5\n").unwrap();

    let assert = harvester(&home)
        .arg("--config")
        .arg(&config)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
    assert_eq!(assert.get_output().status.code(), Some(1));
}
