//! Filesystem-backed artifact store.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jobscope_shared::errors::{JobscopeError, JobscopeResult};
use jobscope_shared::layout::ExecutionLayout;
use walkdir::WalkDir;

use super::{ArtifactKey, ArtifactKind, ArtifactNode, ArtifactStore, ExecutionRoot, NodeKind};
use crate::execution::ExecutionId;
use crate::resource::remove_path;
use crate::runtime::layout::FilesystemLayout;

/// Artifact store laid out under `{home}/executions/{execution-id}/`.
///
/// Writes go through a temp file in the target directory and are renamed into
/// place, so readers never observe a half-written document.
#[derive(Clone, Debug)]
pub struct FilesystemStore {
    layout: FilesystemLayout,
}

impl FilesystemStore {
    /// Create a store over `layout`, preparing its directories.
    pub fn new(layout: FilesystemLayout) -> JobscopeResult<Self> {
        layout.prepare()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &FilesystemLayout {
        &self.layout
    }

    fn execution_layout(&self, execution_id: &ExecutionId) -> ExecutionLayout {
        self.layout.execution_layout(&execution_id.to_string())
    }

    /// Path backing `key`.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        let execution = self.execution_layout(&key.execution_id());
        match (key.kind(), key.name()) {
            (ArtifactKind::Temporary, Some(name)) => execution.temporary_path(name),
            (ArtifactKind::Output, Some(name)) => execution.output_path(name),
            (ArtifactKind::Request, _) => execution.request_path(),
            (ArtifactKind::Response, _) => execution.response_path(),
            // Keys are validated on construction; named kinds always carry a name.
            (ArtifactKind::Temporary, None) => execution.temporary_dir(),
            (ArtifactKind::Output, None) => execution.outputs_dir(),
        }
    }

    fn parent_dir(&self, key: &ArtifactKey) -> PathBuf {
        let execution = self.execution_layout(&key.execution_id());
        match key.kind() {
            ArtifactKind::Temporary => execution.temporary_dir(),
            ArtifactKind::Output => execution.outputs_dir(),
            ArtifactKind::Request | ArtifactKind::Response => execution.root().to_path_buf(),
        }
    }

    fn snapshot(path: &Path) -> std::io::Result<ArtifactNode> {
        let metadata = std::fs::symlink_metadata(path)?;
        let modified: DateTime<Utc> = metadata.modified()?.into();

        let kind = if metadata.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<_>>()?;
            entries.sort();

            let mut children = Vec::with_capacity(entries.len());
            for entry in entries {
                match Self::snapshot(&entry) {
                    Ok(child) => children.push(child),
                    // Removed between read_dir and stat
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
            NodeKind::Container(children)
        } else {
            NodeKind::Resource
        };

        Ok(ArtifactNode {
            location: path.to_path_buf(),
            modified,
            kind,
        })
    }
}

impl ArtifactStore for FilesystemStore {
    fn prepare(&self, key: &ArtifactKey) -> JobscopeResult<()> {
        let dir = self.parent_dir(key);
        std::fs::create_dir_all(&dir).map_err(|e| {
            JobscopeError::ArtifactStore(format!("failed to create {}: {}", dir.display(), e))
        })
    }

    fn exists(&self, key: &ArtifactKey) -> JobscopeResult<bool> {
        let path = self.path_for(key);
        path.try_exists().map_err(|e| {
            JobscopeError::ArtifactStore(format!("failed to stat {}: {}", path.display(), e))
        })
    }

    fn read(&self, key: &ArtifactKey) -> JobscopeResult<Vec<u8>> {
        let path = self.path_for(key);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                JobscopeError::ArtifactStore(format!("artifact {} not found", key))
            } else {
                JobscopeError::ArtifactStore(format!("failed to read {}: {}", path.display(), e))
            }
        })
    }

    fn write(&self, key: &ArtifactKey, bytes: &[u8]) -> JobscopeResult<()> {
        self.prepare(key)?;
        let dir = self.parent_dir(key);
        let path = self.path_for(key);

        let mut staged = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(&dir)
            .map_err(|e| {
                JobscopeError::ArtifactStore(format!("failed to stage {}: {}", key, e))
            })?;
        staged.write_all(bytes).map_err(|e| {
            JobscopeError::ArtifactStore(format!("failed to write {}: {}", key, e))
        })?;
        staged.persist(&path).map_err(|e| {
            JobscopeError::ArtifactStore(format!(
                "failed to move {} into place: {}",
                path.display(),
                e.error
            ))
        })?;

        tracing::trace!(artifact = %key, bytes = bytes.len(), "Wrote artifact");
        Ok(())
    }

    fn local_path(&self, key: &ArtifactKey) -> Option<PathBuf> {
        Some(self.path_for(key))
    }

    fn delete_artifact(&self, key: &ArtifactKey) -> JobscopeResult<bool> {
        remove_path(&self.path_for(key))
    }

    fn clear_artifacts(&self, execution_id: &ExecutionId) -> JobscopeResult<usize> {
        let execution = self.execution_layout(execution_id);
        let root = execution.root();
        if !root.exists() {
            return Ok(0);
        }

        let entries = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .count();

        remove_path(root)?;
        tracing::debug!(execution_id = %execution_id, entries, "Cleared execution artifacts");
        Ok(entries)
    }

    fn list_execution_roots(&self) -> JobscopeResult<Vec<ExecutionRoot>> {
        let executions_dir = self.layout.executions_dir();
        let entries = match std::fs::read_dir(&executions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(JobscopeError::ArtifactStore(format!(
                    "failed to list {}: {}",
                    executions_dir.display(),
                    e
                )));
            }
        };

        let mut roots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                JobscopeError::ArtifactStore(format!(
                    "failed to list {}: {}",
                    executions_dir.display(),
                    e
                ))
            })?;
            let path = entry.path();

            let Some(execution_id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<ExecutionId>().ok())
            else {
                tracing::warn!(path = %path.display(), "Skipping foreign entry in executions dir");
                continue;
            };

            match Self::snapshot(&path) {
                Ok(node) => roots.push(ExecutionRoot { execution_id, node }),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        execution_id = %execution_id,
                        error = %e,
                        "Failed to snapshot execution directory, skipping"
                    );
                }
            }
        }

        roots.sort_by_key(|root| root.execution_id);
        Ok(roots)
    }

    fn remove_node(&self, node: &ArtifactNode) -> JobscopeResult<bool> {
        let path = &node.location;
        if !path.starts_with(self.layout.executions_dir()) {
            return Err(JobscopeError::ArtifactStore(format!(
                "{} is outside the store",
                path.display()
            )));
        }

        let result = match node.kind {
            NodeKind::Resource => std::fs::remove_file(path),
            NodeKind::Container(_) => std::fs::remove_dir(path),
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
}
