//! Error types shared across jobscope crates.

use thiserror::Error;

/// Errors surfaced by the execution resource manager.
///
/// Deletion failures during cleanup are deliberately absent: they are logged
/// and counted, never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobscopeError {
    /// An operation referenced an execution id that is not in the registry.
    #[error("unknown execution: {0}")]
    UnknownExecution(String),

    /// The artifact store failed to read, write or prepare an artifact.
    #[error("artifact store error: {0}")]
    ArtifactStore(String),

    /// Malformed artifact key (bad name for the artifact kind).
    #[error("invalid artifact key: {0}")]
    InvalidArtifactKey(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobscopeError {
    /// True for errors that indicate a caller bug rather than an environment failure.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            JobscopeError::UnknownExecution(_) | JobscopeError::InvalidArtifactKey(_)
        )
    }
}

pub type JobscopeResult<T> = Result<T, JobscopeError>;
