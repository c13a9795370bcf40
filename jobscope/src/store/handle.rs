use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use jobscope_shared::errors::{JobscopeError, JobscopeResult};

use super::{ArtifactKey, ArtifactKind, ArtifactStore};
use crate::document::Document;
use crate::execution::ExecutionId;
use crate::resource::ResourceHandle;

/// Read/write handle to one artifact in a store.
///
/// Cheap to clone; all clones address the same artifact.
#[derive(Clone)]
pub struct ArtifactHandle {
    key: ArtifactKey,
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactHandle {
    /// Prepare `key` in `store` and return a handle to it.
    pub fn open(store: Arc<dyn ArtifactStore>, key: ArtifactKey) -> JobscopeResult<Self> {
        store.prepare(&key)?;
        Ok(Self { key, store })
    }

    /// Handle to an artifact that must already exist.
    ///
    /// Returns `Ok(None)` when nothing is stored under `key`.
    pub fn existing(store: Arc<dyn ArtifactStore>, key: ArtifactKey) -> JobscopeResult<Option<Self>> {
        if store.exists(&key)? {
            Ok(Some(Self { key, store }))
        } else {
            Ok(None)
        }
    }

    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.key.execution_id()
    }

    pub fn kind(&self) -> ArtifactKind {
        self.key.kind()
    }

    pub fn exists(&self) -> JobscopeResult<bool> {
        self.store.exists(&self.key)
    }

    pub fn read(&self) -> JobscopeResult<Vec<u8>> {
        self.store.read(&self.key)
    }

    pub fn read_to_string(&self) -> JobscopeResult<String> {
        String::from_utf8(self.read()?).map_err(|e| {
            JobscopeError::ArtifactStore(format!("artifact {} is not UTF-8: {}", self.key, e))
        })
    }

    pub fn write(&self, bytes: &[u8]) -> JobscopeResult<()> {
        self.store.write(&self.key, bytes)
    }

    pub fn read_document<D: Document>(&self) -> JobscopeResult<D> {
        D::from_bytes(&self.read()?)
    }

    pub fn write_document<D: Document>(&self, document: &D) -> JobscopeResult<()> {
        self.write(&document.to_bytes()?)
    }

    /// Backing file, for tools that need a real path.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.store.local_path(&self.key)
    }
}

impl ResourceHandle for ArtifactHandle {
    fn name(&self) -> String {
        self.key.to_string()
    }

    fn delete(&self) -> JobscopeResult<()> {
        self.store.delete_artifact(&self.key).map(|_| ())
    }
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("key", &self.key)
            .finish()
    }
}
