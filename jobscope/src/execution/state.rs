//! Per-execution resource record.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use jobscope_shared::errors::{JobscopeError, JobscopeResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::id::ExecutionId;
use crate::resource::ResourceHandle;

/// Lifecycle state visible through [`ExecutionInfo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Resources may still be registered.
    Active,
    /// Completion was signalled; awaiting sweep.
    Completed,
}

/// Everything the registry tracks for one execution.
///
/// `temporary` is append-only while the execution runs and drained exactly
/// once by the cleanup engine. `completed_at` is written at most once.
pub struct ExecutionResources {
    id: ExecutionId,
    synchronous: bool,
    created_at: DateTime<Utc>,
    temporary: Mutex<Vec<Box<dyn ResourceHandle>>>,
    outputs_locked: AtomicBool,
    completed_at: OnceLock<DateTime<Utc>>,
}

impl ExecutionResources {
    pub(crate) fn new(id: ExecutionId, synchronous: bool) -> Self {
        Self {
            id,
            synchronous,
            created_at: Utc::now(),
            temporary: Mutex::new(Vec::new()),
            outputs_locked: AtomicBool::new(false),
            completed_at: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    /// Whether temporaries are cleaned when the unit of work finishes.
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn push_temporary(&self, handle: Box<dyn ResourceHandle>) {
        self.temporary.lock().push(handle);
    }

    /// Take every registered temporary, leaving the list empty.
    pub(crate) fn take_temporary(&self) -> Vec<Box<dyn ResourceHandle>> {
        std::mem::take(&mut *self.temporary.lock())
    }

    pub fn temporary_count(&self) -> usize {
        self.temporary.lock().len()
    }

    /// Set the outputs-locked flag. Returns false if it was already set.
    pub(crate) fn lock_outputs(&self) -> bool {
        !self.outputs_locked.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn unlock_outputs(&self) {
        self.outputs_locked.store(false, Ordering::Release);
    }

    pub fn outputs_locked(&self) -> bool {
        self.outputs_locked.load(Ordering::Acquire)
    }

    /// Record completion. Returns false if completion was already recorded.
    pub(crate) fn mark_complete(&self, at: DateTime<Utc>) -> bool {
        self.completed_at.set(at).is_ok()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.get().copied()
    }

    pub fn state(&self) -> ExecutionState {
        if self.completed_at.get().is_some() {
            ExecutionState::Completed
        } else {
            ExecutionState::Active
        }
    }

    /// Completed strictly before `threshold`.
    pub fn completed_before(&self, threshold: DateTime<Utc>) -> bool {
        self.completed_at().is_some_and(|at| at < threshold)
    }

    pub fn to_info(&self) -> ExecutionInfo {
        ExecutionInfo {
            id: self.id,
            synchronous: self.synchronous,
            state: self.state(),
            created_at: self.created_at,
            completed_at: self.completed_at(),
            temporary_count: self.temporary_count(),
            outputs_locked: self.outputs_locked(),
        }
    }
}

impl fmt::Debug for ExecutionResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionResources")
            .field("id", &self.id)
            .field("synchronous", &self.synchronous)
            .field("state", &self.state())
            .field("temporary_count", &self.temporary_count())
            .field("outputs_locked", &self.outputs_locked())
            .finish()
    }
}

/// Keeps an execution's outputs out of the sweep until dropped.
#[must_use = "outputs are unlocked when the guard is dropped"]
#[derive(Debug)]
pub struct OutputLock {
    record: Arc<ExecutionResources>,
}

impl OutputLock {
    /// Fails if another guard already holds the flag.
    pub(crate) fn acquire(record: Arc<ExecutionResources>) -> JobscopeResult<Self> {
        if !record.lock_outputs() {
            return Err(JobscopeError::Internal(format!(
                "outputs of execution {} are already locked",
                record.id()
            )));
        }
        Ok(Self { record })
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.record.id()
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        self.record.unlock_outputs();
    }
}

/// Public snapshot of an execution record (for list operations).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub id: ExecutionId,
    pub synchronous: bool,
    pub state: ExecutionState,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub temporary_count: usize,
    pub outputs_locked: bool,
}
