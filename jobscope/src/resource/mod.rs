//! Resource handles registered for cleanup.
//!
//! A handle wraps one physical artifact reference and knows how to delete it.
//! It carries no storage policy: whether and when it is deleted is decided by
//! the cleanup engine.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jobscope_shared::errors::{JobscopeError, JobscopeResult};

/// Something that can be deleted at cleanup time.
///
/// `delete` must treat an already-missing resource as success.
pub trait ResourceHandle: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> String;

    fn delete(&self) -> JobscopeResult<()>;
}

impl<T: ResourceHandle + ?Sized> ResourceHandle for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn delete(&self) -> JobscopeResult<()> {
        (**self).delete()
    }
}

/// A local file or directory tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResourceHandle for FileResource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn delete(&self) -> JobscopeResult<()> {
        remove_path(&self.path).map(|_| ())
    }
}

/// Remove a file or directory tree. Returns whether anything was removed.
pub(crate) fn remove_path(path: &Path) -> JobscopeResult<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(JobscopeError::ArtifactStore(format!(
                "failed to stat {}: {}",
                path.display(),
                e
            )));
        }
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(JobscopeError::ArtifactStore(format!(
            "failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}
