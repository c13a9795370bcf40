//! Manager-level metrics (aggregate across all executions).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage for manager-wide counters.
///
/// Shared by the facade and the cleanup engine. All counters are monotonic
/// (never decrease).
#[derive(Clone, Debug, Default)]
pub struct ManagerMetricsStorage {
    /// Executions created (explicitly or implicitly)
    pub(crate) executions_started: Arc<AtomicU64>,
    /// Completion signals that newly completed an execution
    pub(crate) executions_completed: Arc<AtomicU64>,
    /// Cancellation signals received
    pub(crate) executions_cancelled: Arc<AtomicU64>,
    /// Temporary handles successfully deleted
    pub(crate) temporaries_deleted: Arc<AtomicU64>,
    /// Deletions that failed and were swallowed
    pub(crate) deletion_failures: Arc<AtomicU64>,
    /// Store nodes removed by sweeps
    pub(crate) artifacts_swept: Arc<AtomicU64>,
}

impl ManagerMetricsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }
}

/// Handle for querying manager-wide metrics.
///
/// Cloneable, lightweight handle (only Arc pointers).
#[derive(Clone, Debug)]
pub struct ManagerMetrics {
    storage: ManagerMetricsStorage,
}

impl ManagerMetrics {
    pub(crate) fn new(storage: ManagerMetricsStorage) -> Self {
        Self { storage }
    }

    /// Total executions created since the manager started.
    pub fn executions_started_total(&self) -> u64 {
        self.storage.executions_started.load(Ordering::Relaxed)
    }

    /// Total executions marked complete.
    pub fn executions_completed_total(&self) -> u64 {
        self.storage.executions_completed.load(Ordering::Relaxed)
    }

    /// Total cancellation signals handled.
    pub fn executions_cancelled_total(&self) -> u64 {
        self.storage.executions_cancelled.load(Ordering::Relaxed)
    }

    /// Total temporary resources deleted at cleanup.
    pub fn temporaries_deleted_total(&self) -> u64 {
        self.storage.temporaries_deleted.load(Ordering::Relaxed)
    }

    /// Total deletions that failed (logged, never surfaced).
    pub fn deletion_failures_total(&self) -> u64 {
        self.storage.deletion_failures.load(Ordering::Relaxed)
    }

    /// Total store nodes removed by sweeps.
    pub fn artifacts_swept_total(&self) -> u64 {
        self.storage.artifacts_swept.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_reads_shared_storage() {
        let storage = ManagerMetricsStorage::new();
        let metrics = ManagerMetrics::new(storage.clone());
        assert_eq!(metrics.temporaries_deleted_total(), 0);

        ManagerMetricsStorage::add(&storage.temporaries_deleted, 3);
        ManagerMetricsStorage::add(&storage.deletion_failures, 0);

        assert_eq!(metrics.temporaries_deleted_total(), 3);
        assert_eq!(metrics.deletion_failures_total(), 0);
    }
}
