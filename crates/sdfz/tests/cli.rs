//! Integration tests for the `sdfz` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use sdfz_test_utils::{DemoBuilder, ScriptBuilder};
use tempfile::TempDir;

fn sdfz() -> Command {
    let mut cmd = cargo_bin_cmd!("sdfz");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn demo(game_id: u8, seconds: u64) -> DemoBuilder {
    DemoBuilder::new()
        .game_id([game_id; 16])
        .script(
            ScriptBuilder::new()
                .game("Glitters 1.2", "Beyond All Reason test-27012")
                .player(0, "Alice", 0)
                .team(0, 0, "Armada")
                .ally_team(0)
                .build(),
        )
        .game_time(seconds)
        .command(1.0, 0, -7, 0, &[100.0, 0.0, 100.0, 0.0])
}

/// A demo directory with two matches and one corrupt file.
fn demo_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    demo(1, 100).write_to(dir.path().join("one.sdfz")).unwrap();
    demo(2, 200)
        .gzip(true)
        .write_to(dir.path().join("two.sdfz"))
        .unwrap();
    std::fs::write(dir.path().join("broken.sdfz"), b"spring demofile").unwrap();
    dir
}

fn scan(dir: &TempDir) -> serde_json::Value {
    let output = sdfz()
        .arg("scan")
        .arg("--demo-dir")
        .arg(dir.path())
        .arg("--db")
        .arg(dir.path().join("cache.sqlite3"))
        .arg("--no-watch")
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn help_describes_tool() {
    sdfz()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spring engine demo reader"));
}

#[test]
fn inspect_prints_record() {
    let dir = demo_dir();
    sdfz()
        .arg("inspect")
        .arg(dir.path().join("one.sdfz"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"map_spring_name\": \"Glitters 1.2\""))
        .stdout(predicate::str::contains("\"commands\": [").not());
}

#[test]
fn inspect_decodes_commands_with_unit_names() {
    let dir = demo_dir();
    let defs = dir.path().join("units.json");
    std::fs::write(&defs, r#"["armcom","armpw","armck","armmex","armsolar","armwin","armlab"]"#)
        .unwrap();
    sdfz()
        .arg("inspect")
        .arg(dir.path().join("one.sdfz"))
        .arg("--commands")
        .arg("--unit-defs")
        .arg(&defs)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"commands\": ["))
        .stdout(predicate::str::contains("\"unit_def_id\": \"armlab\""));
}

#[test]
fn inspect_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    sdfz()
        .arg("inspect")
        .arg(dir.path().join("nope.sdfz"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn scan_caches_and_tombstones() {
    let dir = demo_dir();
    let summary = scan(&dir);
    assert_eq!(summary["cached"], 2);
    assert_eq!(summary["errored"], 1);
    assert_eq!(summary["total"], 2);

    let again = scan(&dir);
    assert_eq!(again["cached"], 0);
    assert_eq!(again["errored"], 0);
    assert_eq!(again["tombstoned"], 1);
}

#[test]
fn list_filters_by_game_id() {
    let dir = demo_dir();
    scan(&dir);
    let db = dir.path().join("cache.sqlite3");

    let all = sdfz().arg("list").arg("--db").arg(&db).output().unwrap();
    assert!(all.status.success());
    assert_eq!(String::from_utf8(all.stdout).unwrap().lines().count(), 2);

    sdfz()
        .arg("list")
        .arg("--db")
        .arg(&db)
        .arg("--game-id")
        .arg("02".repeat(16))
        .assert()
        .success()
        .stdout(predicate::str::contains("two.sdfz"))
        .stdout(predicate::str::contains("one.sdfz").not());
}

#[test]
fn list_rejects_bad_game_id() {
    let dir = tempfile::tempdir().unwrap();
    sdfz()
        .arg("list")
        .arg("--db")
        .arg(dir.path().join("cache.sqlite3"))
        .arg("--game-id")
        .arg("xyz")
        .assert()
        .failure();
}

#[test]
fn clear_errors_reports_count() {
    let dir = demo_dir();
    scan(&dir);
    sdfz()
        .arg("clear-errors")
        .arg("--db")
        .arg(dir.path().join("cache.sqlite3"))
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn watch_stops_when_stdin_closes() {
    let dir = demo_dir();
    sdfz()
        .arg("watch")
        .arg("--demo-dir")
        .arg(dir.path())
        .arg("--db")
        .arg(dir.path().join("cache.sqlite3"))
        .arg("--no-watch")
        .arg("--idle-ms")
        .arg("10")
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn scan_rejects_missing_demo_dir() {
    let dir = tempfile::tempdir().unwrap();
    sdfz()
        .arg("scan")
        .arg("--demo-dir")
        .arg(dir.path().join("missing"))
        .arg("--db")
        .arg(dir.path().join("cache.sqlite3"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
