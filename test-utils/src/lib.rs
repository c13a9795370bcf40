//! Shared fixtures for jobscope integration tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use jobscope::{
    ExecutionId, JobscopeError, JobscopeResult, ManagerOptions, ResourceHandle, ResourceManager,
    RunState, StatusTracker,
};
use parking_lot::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

// ============================================================================
// RESOURCE HANDLES
// ============================================================================

/// Handle that records how often it was deleted.
///
/// Clones share the counter: register one clone, keep another as a probe.
#[derive(Clone, Debug)]
pub struct CountingHandle {
    name: String,
    deletes: Arc<AtomicUsize>,
}

impl CountingHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deletes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> bool {
        self.delete_count() > 0
    }
}

impl ResourceHandle for CountingHandle {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn delete(&self) -> JobscopeResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle whose deletion always fails.
#[derive(Clone, Debug)]
pub struct FailingHandle {
    name: String,
    attempts: Arc<AtomicUsize>,
}

impl FailingHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ResourceHandle for FailingHandle {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn delete(&self) -> JobscopeResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(JobscopeError::ArtifactStore(format!(
            "{}: permission denied",
            self.name
        )))
    }
}

// ============================================================================
// STATUS TRACKER
// ============================================================================

/// Tracker answering from a mutable table; unlisted ids are `Unknown`.
#[derive(Clone, Debug, Default)]
pub struct StaticTracker {
    states: Arc<Mutex<HashMap<ExecutionId, RunState>>>,
}

impl StaticTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(ids: impl IntoIterator<Item = ExecutionId>) -> Self {
        let tracker = Self::new();
        for id in ids {
            tracker.set(id, RunState::Running);
        }
        tracker
    }

    pub fn set(&self, id: ExecutionId, state: RunState) {
        self.states.lock().insert(id, state);
    }
}

impl StatusTracker for StaticTracker {
    fn run_state(&self, execution_id: &ExecutionId) -> RunState {
        self.states
            .lock()
            .get(execution_id)
            .copied()
            .unwrap_or(RunState::Unknown)
    }
}

// ============================================================================
// TEST STORE
// ============================================================================

/// A manager over a private temporary store home.
///
/// File logging is off so tests don't install a global subscriber.
pub struct TestStore {
    pub manager: ResourceManager,
    _temp_dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_options(|_| {})
    }

    pub fn with_options(configure: impl FnOnce(&mut ManagerOptions)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut options = ManagerOptions::with_home(temp_dir.path());
        options.file_logging = false;
        configure(&mut options);

        let manager = ResourceManager::new(options).expect("Failed to create manager");
        Self {
            manager,
            _temp_dir: temp_dir,
        }
    }

    pub fn home(&self) -> &Path {
        self._temp_dir.path()
    }

    pub fn executions_dir(&self) -> PathBuf {
        self.home().join("executions")
    }

    pub fn execution_dir(&self, id: &ExecutionId) -> PathBuf {
        self.executions_dir().join(id.to_string())
    }

    /// Create a scratch file outside the store.
    pub fn scratch_file(&self, name: &str) -> PathBuf {
        let path = self.home().join(name);
        std::fs::write(&path, b"scratch").expect("Failed to write scratch file");
        path
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TIME
// ============================================================================

/// Set the mtime of `path` to `age` ago.
pub fn backdate(path: &Path, age: Duration) {
    let when = SystemTime::now() - age;
    filetime::set_file_mtime(path, FileTime::from_system_time(when))
        .unwrap_or_else(|e| panic!("Failed to backdate {}: {}", path.display(), e));
}

/// Backdate `path` and everything below it, children before parents.
pub fn backdate_tree(path: &Path, age: Duration) {
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.expect("Failed to walk tree");
        backdate(entry.path(), age);
    }
}
