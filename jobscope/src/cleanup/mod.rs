//! Cleanup engine: deletes what executions leave behind.
//!
//! Three passes share one failure policy: a deletion that fails is logged with
//! the resource's name and counted, and the pass carries on with the rest.
//! Nothing here returns a deletion error to the caller.
//!
//! - [`CleanupEngine::cleanup_temporary`]: drain and delete registered temporaries
//! - [`CleanupEngine::cleanup_all`]: the above, plus purge the store (cancellation)
//! - [`CleanupEngine::sweep`]: store-wide removal of expired, non-running executions

mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::execution::{ExecutionId, ExecutionRegistry};
use crate::metrics::ManagerMetricsStorage;
use crate::resource::ResourceHandle;
use crate::status::StatusTracker;
use crate::store::{ArtifactNode, ArtifactStore, NodeKind};

pub use sweeper::SweeperHandle;

/// Outcome of a temporary cleanup or cancellation purge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Registered handles deleted.
    pub deleted: usize,
    /// Deletions that failed (handles or the store purge).
    pub failed: usize,
    /// Store entries removed by a purge.
    pub purged: usize,
}

/// Outcome of a sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub roots_scanned: usize,
    /// Roots left alone because the execution is running or its outputs are locked.
    pub roots_skipped: usize,
    /// Roots whose whole subtree was removed.
    pub fully_cleaned_roots: usize,
    pub artifacts_removed: usize,
    pub deletion_failures: usize,
    /// Completed registry records evicted.
    pub evicted: usize,
}

/// Sweep threshold for a retention period, relative to now.
pub fn retention_threshold(retention: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(retention)
        .ok()
        .and_then(|retention| now.checked_sub_signed(retention))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Deletes registered temporaries and expired store contents.
///
/// Cloneable: clones share the registry, store and metrics.
#[derive(Clone, Debug)]
pub struct CleanupEngine {
    registry: ExecutionRegistry,
    store: Arc<dyn ArtifactStore>,
    metrics: ManagerMetricsStorage,
}

impl CleanupEngine {
    pub fn new(
        registry: ExecutionRegistry,
        store: Arc<dyn ArtifactStore>,
        metrics: ManagerMetricsStorage,
    ) -> Self {
        Self {
            registry,
            store,
            metrics,
        }
    }

    /// Drain the temporary list of `execution_id` and delete each handle.
    ///
    /// A second call finds the list empty and does nothing. Unknown ids are a
    /// no-op as well, so this is safe after eviction.
    pub fn cleanup_temporary(&self, execution_id: &ExecutionId) -> CleanupReport {
        let handles = match self.registry.drain_temporary(execution_id) {
            Ok(Some(handles)) => handles,
            Ok(None) => {
                tracing::trace!(execution_id = %execution_id, "No registry record, nothing to clean");
                return CleanupReport::default();
            }
            Err(e) => {
                tracing::warn!(execution_id = %execution_id, error = %e, "Failed to drain temporaries");
                return CleanupReport::default();
            }
        };

        self.delete_handles(execution_id, handles)
    }

    fn delete_handles(
        &self,
        execution_id: &ExecutionId,
        handles: Vec<Box<dyn ResourceHandle>>,
    ) -> CleanupReport {
        let mut report = CleanupReport::default();
        if handles.is_empty() {
            return report;
        }

        for handle in handles {
            match handle.delete() {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        execution_id = %execution_id,
                        resource = %handle.name(),
                        error = %e,
                        "Failed to delete temporary resource"
                    );
                    report.failed += 1;
                }
            }
        }

        ManagerMetricsStorage::add(&self.metrics.temporaries_deleted, report.deleted as u64);
        ManagerMetricsStorage::add(&self.metrics.deletion_failures, report.failed as u64);
        tracing::debug!(
            execution_id = %execution_id,
            deleted = report.deleted,
            failed = report.failed,
            "Cleaned up temporary resources"
        );
        report
    }

    /// Clean temporaries and, when `purge_outputs` is set, delete every
    /// artifact the store holds for the execution, registered or not.
    pub fn cleanup_all(&self, execution_id: &ExecutionId, purge_outputs: bool) -> CleanupReport {
        let mut report = self.cleanup_temporary(execution_id);
        if !purge_outputs {
            return report;
        }

        match self.store.clear_artifacts(execution_id) {
            Ok(purged) => {
                report.purged = purged;
                tracing::debug!(execution_id = %execution_id, purged, "Purged execution artifacts");
            }
            Err(e) => {
                tracing::warn!(execution_id = %execution_id, error = %e, "Failed to purge execution artifacts");
                report.failed += 1;
                ManagerMetricsStorage::add(&self.metrics.deletion_failures, 1);
            }
        }
        report
    }

    /// Whether the sweep must leave `execution_id` alone.
    ///
    /// Protected: running per the tracker, active or completed at or after
    /// `older_than` in the registry, or outputs locked by a reader.
    fn is_protected(
        &self,
        execution_id: &ExecutionId,
        older_than: DateTime<Utc>,
        tracker: &dyn StatusTracker,
    ) -> bool {
        if tracker.run_state(execution_id).is_running() {
            return true;
        }
        match self.registry.get(execution_id) {
            // Active records have no completion time and never compare older.
            Ok(Some(record)) => !record.completed_before(older_than) || record.outputs_locked(),
            Ok(None) => false,
            // Can't tell; err on the side of keeping data.
            Err(_) => true,
        }
    }

    /// Remove store contents of non-running executions older than `older_than`.
    ///
    /// Walks the store listing rather than the registry so that data orphaned
    /// by a crash or a missed completion signal is found too.
    pub fn sweep_expired(&self, older_than: DateTime<Utc>, tracker: &dyn StatusTracker) -> SweepReport {
        let mut report = SweepReport::default();

        let roots = match self.store.list_execution_roots() {
            Ok(roots) => roots,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list artifact store, skipping sweep");
                return report;
            }
        };

        for root in roots {
            report.roots_scanned += 1;
            if self.is_protected(&root.execution_id, older_than, tracker) {
                tracing::trace!(execution_id = %root.execution_id, "Execution protected, skipping");
                report.roots_skipped += 1;
                continue;
            }

            if self.sweep_node(&root.node, older_than, &mut report) {
                tracing::debug!(execution_id = %root.execution_id, "Swept execution artifacts");
                report.fully_cleaned_roots += 1;
            }
        }

        ManagerMetricsStorage::add(&self.metrics.artifacts_swept, report.artifacts_removed as u64);
        ManagerMetricsStorage::add(&self.metrics.deletion_failures, report.deletion_failures as u64);
        report
    }

    /// Sweep one node. Children are handled first; a container is removed only
    /// when every child was removed and its own listing mtime is older than the
    /// threshold.
    ///
    /// Returns whether the whole subtree is gone.
    pub fn sweep_node(
        &self,
        node: &ArtifactNode,
        older_than: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> bool {
        match &node.kind {
            NodeKind::Resource => node.modified < older_than && self.remove_node(node, report),
            NodeKind::Container(children) => {
                let mut all_removed = true;
                for child in children {
                    if !self.sweep_node(child, older_than, report) {
                        all_removed = false;
                    }
                }
                all_removed && node.modified < older_than && self.remove_node(node, report)
            }
        }
    }

    fn remove_node(&self, node: &ArtifactNode, report: &mut SweepReport) -> bool {
        match self.store.remove_node(node) {
            Ok(removed) => {
                if removed {
                    report.artifacts_removed += 1;
                }
                true
            }
            Err(e) => {
                tracing::warn!(
                    artifact = %node.location.display(),
                    error = %e,
                    "Failed to remove expired artifact"
                );
                report.deletion_failures += 1;
                false
            }
        }
    }

    /// Clean and evict registry records completed before `older_than`.
    fn evict_expired(
        &self,
        older_than: DateTime<Utc>,
        tracker: &dyn StatusTracker,
        report: &mut SweepReport,
    ) {
        let records = match self.registry.records() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to snapshot registry, skipping eviction");
                return;
            }
        };

        for record in records {
            let id = record.id();
            if !record.completed_before(older_than)
                || record.outputs_locked()
                || tracker.run_state(&id).is_running()
            {
                continue;
            }

            let cleaned = self.cleanup_temporary(&id);
            report.deletion_failures += cleaned.failed;
            match self.registry.evict(&id) {
                Ok(Some(_)) => report.evicted += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(execution_id = %id, error = %e, "Failed to evict execution");
                }
            }
        }
    }

    /// Full sweep: the store pass, then eviction of expired registry records.
    pub fn sweep(&self, older_than: DateTime<Utc>, tracker: &dyn StatusTracker) -> SweepReport {
        let mut report = self.sweep_expired(older_than, tracker);
        self.evict_expired(older_than, tracker, &mut report);

        tracing::info!(
            roots_scanned = report.roots_scanned,
            roots_skipped = report.roots_skipped,
            fully_cleaned = report.fully_cleaned_roots,
            removed = report.artifacts_removed,
            failures = report.deletion_failures,
            evicted = report.evicted,
            "Sweep finished"
        );
        report
    }
}
