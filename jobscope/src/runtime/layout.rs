use jobscope_shared::errors::{JobscopeError, JobscopeResult};
use jobscope_shared::layout::{ExecutionLayout, StoreLayout};
use std::path::{Path, PathBuf};

/// Directory structure constants
pub mod dirs {
    /// Base directory name for jobscope data
    pub const JOBSCOPE_DIR: &str = ".jobscope";

    /// Subdirectory for log files
    pub const LOGS_DIR: &str = "logs";
}

// ============================================================================
// FILESYSTEM LAYOUT (home directory)
// ============================================================================

/// Layout of a store home directory.
///
/// ```text
/// ~/.jobscope/
/// ├── .lock               # StoreLock
/// ├── logs/
/// └── executions/         # StoreLayout
///     └── {execution_id}/ # ExecutionLayout
/// ```
#[derive(Clone, Debug)]
pub struct FilesystemLayout {
    home_dir: PathBuf,
    store: StoreLayout,
}

impl FilesystemLayout {
    pub fn new(home_dir: PathBuf) -> Self {
        let store = StoreLayout::new(home_dir.clone());
        Self { home_dir, store }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join(dirs::LOGS_DIR)
    }

    /// Root directory for all execution artifacts: ~/.jobscope/executions
    pub fn executions_dir(&self) -> PathBuf {
        self.store.executions_dir()
    }

    /// Layout for a specific execution directory.
    pub fn execution_layout(&self, execution_id: &str) -> ExecutionLayout {
        self.store.execution(execution_id)
    }

    /// Initialize the filesystem structure.
    ///
    /// Creates the home, executions and logs directories.
    pub fn prepare(&self) -> JobscopeResult<()> {
        std::fs::create_dir_all(&self.home_dir)
            .map_err(|e| JobscopeError::ArtifactStore(format!("failed to create home: {e}")))?;

        std::fs::create_dir_all(self.executions_dir()).map_err(|e| {
            JobscopeError::ArtifactStore(format!("failed to create executions dir: {e}"))
        })?;

        std::fs::create_dir_all(self.logs_dir())
            .map_err(|e| JobscopeError::ArtifactStore(format!("failed to create logs dir: {e}")))?;

        Ok(())
    }
}
