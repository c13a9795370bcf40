//! Artifact store layout definitions shared between the manager and tooling.
//!
//! This module provides layout structs for the on-disk artifact store:
//! - `StoreLayout`: Layout of the executions root (one directory per execution)
//! - `ExecutionLayout`: Per-execution directory layout within executions/
//!
//! Lives in jobscope-shared so the manager, the CLI and external store
//! implementations agree on where each artifact kind lives.

use std::path::{Path, PathBuf};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Store directory names.
pub mod dirs {
    /// Root of all per-execution directories
    pub const EXECUTIONS: &str = "executions";

    /// Temporary artifacts, deleted when the execution is cleaned up
    pub const TEMPORARY: &str = "temporary";

    /// Output artifacts, kept for later retrieval by the client
    pub const OUTPUTS: &str = "outputs";
}

/// Fixed file names for at-most-one-per-execution artifacts.
pub mod files {
    /// Stored request document
    pub const REQUEST: &str = "request";

    /// Stored response document
    pub const RESPONSE: &str = "response";
}

// ============================================================================
// EXECUTION LAYOUT (per-execution directories)
// ============================================================================

/// Per-execution directory layout within the store.
///
/// ```text
/// {root}/                    # executions/{execution-id}/
/// ├── temporary/
/// │   └── {name}
/// ├── outputs/
/// │   └── {name}
/// ├── request
/// └── response
/// ```
#[derive(Clone, Debug)]
pub struct ExecutionLayout {
    root: PathBuf,
}

impl ExecutionLayout {
    /// Create an execution layout with the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this execution: executions/{id}
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temporary directory: {root}/temporary
    pub fn temporary_dir(&self) -> PathBuf {
        self.root.join(dirs::TEMPORARY)
    }

    /// Outputs directory: {root}/outputs
    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(dirs::OUTPUTS)
    }

    /// Specific temporary artifact: {root}/temporary/{name}
    pub fn temporary_path(&self, name: &str) -> PathBuf {
        self.temporary_dir().join(name)
    }

    /// Specific output artifact: {root}/outputs/{name}
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.outputs_dir().join(name)
    }

    /// Stored request document: {root}/request
    pub fn request_path(&self) -> PathBuf {
        self.root.join(files::REQUEST)
    }

    /// Stored response document: {root}/response
    pub fn response_path(&self) -> PathBuf {
        self.root.join(files::RESPONSE)
    }
}

// ============================================================================
// STORE LAYOUT (executions root)
// ============================================================================

/// Layout of the executions root inside a store home.
///
/// ```text
/// {base}/
/// └── executions/
///     └── {execution-id}/     # ExecutionLayout
/// ```
#[derive(Clone, Debug)]
pub struct StoreLayout {
    base: PathBuf,
}

impl StoreLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Executions directory: {base}/executions
    pub fn executions_dir(&self) -> PathBuf {
        self.base.join(dirs::EXECUTIONS)
    }

    /// Get layout for a specific execution.
    pub fn execution(&self, execution_id: &str) -> ExecutionLayout {
        ExecutionLayout::new(self.executions_dir().join(execution_id))
    }
}
