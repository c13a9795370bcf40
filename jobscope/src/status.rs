//! Status tracker capability consumed by the sweep.

use std::collections::HashSet;

use crate::execution::ExecutionId;

/// What a status tracker knows about an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    NotRunning,
    /// The tracker has never heard of this execution.
    Unknown,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

/// Reports whether an execution is still running.
///
/// Only `Running` protects an execution from the sweep; `Unknown` is treated
/// like `NotRunning` so that data orphaned by a crash is eventually removed.
pub trait StatusTracker: Send + Sync {
    fn run_state(&self, execution_id: &ExecutionId) -> RunState;
}

impl<F> StatusTracker for F
where
    F: Fn(&ExecutionId) -> RunState + Send + Sync,
{
    fn run_state(&self, execution_id: &ExecutionId) -> RunState {
        self(execution_id)
    }
}

/// Tracker that knows nothing; every execution is `Unknown`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTracker;

impl StatusTracker for NoTracker {
    fn run_state(&self, _execution_id: &ExecutionId) -> RunState {
        RunState::Unknown
    }
}

/// Tracker over a fixed set of running executions.
#[derive(Clone, Debug, Default)]
pub struct RunningSet {
    running: HashSet<ExecutionId>,
}

impl RunningSet {
    pub fn new(running: impl IntoIterator<Item = ExecutionId>) -> Self {
        Self {
            running: running.into_iter().collect(),
        }
    }
}

impl StatusTracker for RunningSet {
    fn run_state(&self, execution_id: &ExecutionId) -> RunState {
        if self.running.contains(execution_id) {
            RunState::Running
        } else {
            RunState::Unknown
        }
    }
}
