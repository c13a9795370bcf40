use std::time::Duration;

use predicates::prelude::*;

mod common;

const DAY: Duration = Duration::from_secs(24 * 3600);

#[test]
fn test_sweep_removes_expired_only() {
    let mut ctx = common::jobscope();
    let old = ctx.seed_old_execution(DAY);
    let young = ctx.seed_execution();

    ctx.cmd
        .args(["sweep", "--older-than", "3600"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scanned 2 execution(s)"))
        .stdout(predicate::str::contains("1 execution(s) fully cleaned"));

    assert!(!ctx.execution_dir(&old).exists());
    assert!(ctx.execution_dir(&young).join("outputs/result.tif").exists());
}

#[test]
fn test_sweep_protects_running() {
    let mut ctx = common::jobscope();
    let running = ctx.seed_old_execution(DAY);
    let finished = ctx.seed_old_execution(DAY);

    ctx.cmd
        .args(["sweep", "--older-than", "3600", "--running", &running.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped 1 protected"));

    assert!(ctx.execution_dir(&running).join("request").exists());
    assert!(!ctx.execution_dir(&finished).exists());
}

#[test]
fn test_sweep_uses_configured_retention() {
    let mut ctx = common::jobscope();
    let id = ctx.seed_old_execution(Duration::from_secs(600));

    let config = ctx.home().join("options.json");
    std::fs::write(&config, r#"{ "retention_secs": 300 }"#).unwrap();

    ctx.cmd
        .arg("--config")
        .arg(&config)
        .arg("sweep")
        .assert()
        .success();

    assert!(!ctx.execution_dir(&id).exists());
}

#[test]
fn test_sweep_rejects_invalid_running_id() {
    let mut ctx = common::jobscope();
    let id = ctx.seed_old_execution(DAY);

    ctx.cmd
        .args(["sweep", "--older-than", "0", "--running", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --running"));

    assert!(ctx.execution_dir(&id).exists());
}

#[test]
fn test_interval_requires_watch() {
    let mut ctx = common::jobscope();
    ctx.cmd.args(["sweep", "--interval", "5"]).assert().failure();
}
