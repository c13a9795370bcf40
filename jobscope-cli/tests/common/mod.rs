#![allow(dead_code)]

use assert_cmd::Command;
use jobscope::runtime::FilesystemLayout;
use jobscope::{ArtifactKey, ArtifactStore, ExecutionId, FilesystemStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestContext {
    pub cmd: Command,
    pub store: FilesystemStore,
    home: TempDir,
}

impl TestContext {
    /// Another command against the same store home.
    pub fn new_cmd(&self) -> Command {
        command(self.home.path())
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn execution_dir(&self, id: &ExecutionId) -> PathBuf {
        self.home.path().join("executions").join(id.to_string())
    }

    /// Store an output and a request for a fresh execution.
    pub fn seed_execution(&self) -> ExecutionId {
        let id = ExecutionId::generate();
        self.store
            .write(&ArtifactKey::output(id, "result.tif").unwrap(), b"II*")
            .unwrap();
        self.store
            .write(&ArtifactKey::request(id), b"<Execute/>")
            .unwrap();
        id
    }

    /// Like [`seed_execution`](Self::seed_execution), with every entry `age` old.
    pub fn seed_old_execution(&self, age: Duration) -> ExecutionId {
        let id = self.seed_execution();
        jobscope_test_utils::backdate_tree(&self.execution_dir(&id), age);
        id
    }
}

fn command(home: &Path) -> Command {
    let bin_path = env!("CARGO_BIN_EXE_jobscope");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(60));
    cmd.env_remove("JOBSCOPE_HOME");
    cmd.arg("--home").arg(home);
    cmd
}

/// A command bound to a private, empty store home.
pub fn jobscope() -> TestContext {
    let home = TempDir::new().expect("Failed to create temp home");
    // Writing through the store directly takes no store lock.
    let store = FilesystemStore::new(FilesystemLayout::new(home.path().to_path_buf()))
        .expect("Failed to create store");

    TestContext {
        cmd: command(home.path()),
        store,
        home,
    }
}
