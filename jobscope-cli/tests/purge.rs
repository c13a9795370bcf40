use jobscope::{ManagerOptions, ResourceManager};
use predicates::prelude::*;

mod common;

#[test]
fn test_purge_single() {
    let mut ctx = common::jobscope();
    let doomed = ctx.seed_execution();
    let kept = ctx.seed_execution();

    ctx.cmd
        .args(["purge", &doomed.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(doomed.to_string()));

    assert!(!ctx.execution_dir(&doomed).exists());
    assert!(ctx.execution_dir(&kept).join("outputs/result.tif").exists());
}

#[test]
fn test_purge_multiple() {
    let mut ctx = common::jobscope();
    let first = ctx.seed_execution();
    let second = ctx.seed_execution();

    ctx.cmd
        .args(["purge", &first.to_string(), &second.to_string()])
        .assert()
        .success();

    assert!(!ctx.execution_dir(&first).exists());
    assert!(!ctx.execution_dir(&second).exists());
}

#[test]
fn test_purge_missing_execution_succeeds() {
    let mut ctx = common::jobscope();
    let id = jobscope::ExecutionId::generate();

    ctx.cmd
        .args(["purge", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.to_string()));
}

#[test]
fn test_purge_invalid_id() {
    let mut ctx = common::jobscope();
    let id = ctx.seed_execution();

    ctx.cmd
        .args(["purge", "not-an-id", &id.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an execution id"))
        .stderr(predicate::str::contains("Failed to purge 1 of 2"));

    // The valid one is still purged.
    assert!(!ctx.execution_dir(&id).exists());
}

#[test]
fn test_purge_requires_argument() {
    let mut ctx = common::jobscope();
    ctx.cmd.arg("purge").assert().failure();
}

#[test]
fn test_purge_fails_while_store_in_use() {
    let mut ctx = common::jobscope();
    let id = ctx.seed_execution();

    let mut options = ManagerOptions::with_home(ctx.home());
    options.file_logging = false;
    let _manager = ResourceManager::new(options).unwrap();

    ctx.cmd
        .args(["purge", &id.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already using directory"));

    assert!(ctx.execution_dir(&id).exists());
}
