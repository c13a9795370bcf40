//! Artifact store abstraction.
//!
//! The manager never touches artifact bytes directly: every read, write and
//! delete goes through an [`ArtifactStore`], addressed by [`ArtifactKey`].
//! [`FilesystemStore`] is the default implementation.

mod fs;
mod handle;
mod key;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobscope_shared::errors::JobscopeResult;

use crate::execution::ExecutionId;

pub use fs::FilesystemStore;
pub use handle::ArtifactHandle;
pub use key::{ArtifactKey, ArtifactKind};

/// Physical storage for execution artifacts.
///
/// Implementations serialize their own physical operations and impose their
/// own timeouts. Deleting something that is already gone is a success.
pub trait ArtifactStore: Send + Sync + fmt::Debug {
    /// Make `key` writable (create-on-first-access).
    fn prepare(&self, key: &ArtifactKey) -> JobscopeResult<()>;

    fn exists(&self, key: &ArtifactKey) -> JobscopeResult<bool>;

    fn read(&self, key: &ArtifactKey) -> JobscopeResult<Vec<u8>>;

    fn write(&self, key: &ArtifactKey, bytes: &[u8]) -> JobscopeResult<()>;

    /// Local filesystem path backing `key`, for stores that have one.
    fn local_path(&self, key: &ArtifactKey) -> Option<PathBuf>;

    /// Delete one artifact. Returns whether something was actually removed.
    fn delete_artifact(&self, key: &ArtifactKey) -> JobscopeResult<bool>;

    /// Delete everything stored under an execution, of every kind.
    /// Returns the number of removed entries.
    fn clear_artifacts(&self, execution_id: &ExecutionId) -> JobscopeResult<usize>;

    /// Snapshot every execution grouping in the store, including ones the
    /// in-memory registry has never seen.
    fn list_execution_roots(&self) -> JobscopeResult<Vec<ExecutionRoot>>;

    /// Remove a single node from a listing: a resource, or a container that
    /// is now empty. Returns whether something was removed.
    fn remove_node(&self, node: &ArtifactNode) -> JobscopeResult<bool>;
}

/// Resolve an artifact and return a handle to it (creating on first access).
pub fn get_artifact(
    store: &Arc<dyn ArtifactStore>,
    execution_id: ExecutionId,
    kind: ArtifactKind,
    name: Option<&str>,
) -> JobscopeResult<ArtifactHandle> {
    let key = ArtifactKey::new(execution_id, kind, name)?;
    ArtifactHandle::open(Arc::clone(store), key)
}

/// One node of a store listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactNode {
    /// Store-defined locator (a filesystem path for [`FilesystemStore`]).
    pub location: PathBuf,
    /// Modification time captured when the listing was taken.
    pub modified: DateTime<Utc>,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A leaf artifact.
    Resource,
    /// A directory-like grouping and its children.
    Container(Vec<ArtifactNode>),
}

impl ArtifactNode {
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container(_))
    }

    pub fn children(&self) -> &[ArtifactNode] {
        match &self.kind {
            NodeKind::Container(children) => children,
            NodeKind::Resource => &[],
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(ArtifactNode::node_count)
            .sum::<usize>()
    }

    /// Newest modification time anywhere in this subtree.
    pub fn newest_modified(&self) -> DateTime<Utc> {
        self.children()
            .iter()
            .map(ArtifactNode::newest_modified)
            .fold(self.modified, |a, b| a.max(b))
    }
}

/// Top-level grouping of one execution's artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRoot {
    pub execution_id: ExecutionId,
    pub node: ArtifactNode,
}
