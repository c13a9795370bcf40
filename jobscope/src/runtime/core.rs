//! The resource manager facade.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::cleanup::{CleanupEngine, CleanupReport, SweepReport, SweeperHandle};
use crate::document::Document;
use crate::execution::{
    ExecutionGuard, ExecutionId, ExecutionInfo, ExecutionRegistry, OutputLock, context,
};
use crate::init_logging_for;
use crate::metrics::{ManagerMetrics, ManagerMetricsStorage};
use crate::resource::ResourceHandle;
use crate::runtime::layout::FilesystemLayout;
use crate::runtime::lock::StoreLock;
use crate::runtime::options::ManagerOptions;
use crate::status::StatusTracker;
use crate::store::{ArtifactHandle, ArtifactKey, ArtifactKind, ArtifactStore, FilesystemStore, get_artifact};
use jobscope_shared::errors::{JobscopeError, JobscopeResult};

// ============================================================================
// PUBLIC API
// ============================================================================

/// Entry point for the dispatch pipeline and for domain code.
///
/// The pipeline calls [`begin_execution`](Self::begin_execution),
/// [`unit_of_work_finished`](Self::unit_of_work_finished),
/// [`execution_completed`](Self::execution_completed),
/// [`execution_cancelled`](Self::execution_cancelled) and
/// [`shutdown`](Self::shutdown). Domain code registers temporaries and opens
/// artifacts against whatever execution is current on its thread or task.
///
/// **Lock Behavior**: a manager built with [`new`](Self::new) holds an
/// exclusive lock on its store home until the last clone is dropped.
///
/// **Cloning**: cheap; all clones share the same registry and store.
#[derive(Clone)]
pub struct ResourceManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    options: ManagerOptions,
    registry: ExecutionRegistry,
    store: Arc<dyn ArtifactStore>,
    engine: CleanupEngine,
    metrics: ManagerMetricsStorage,
    _store_lock: Option<StoreLock>,
}

impl ResourceManager {
    /// Create a manager over the filesystem store at `options.home_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The options are invalid (relative home, zero sweep interval)
    /// - The store directories cannot be created
    /// - Another manager already holds the store home
    pub fn new(options: ManagerOptions) -> JobscopeResult<Self> {
        options.validate()?;

        let layout = FilesystemLayout::new(options.home_dir.clone());
        layout.prepare().map_err(|e| {
            JobscopeError::ArtifactStore(format!(
                "Failed to initialize store at {}: {}",
                layout.home_dir().display(),
                e
            ))
        })?;

        if options.file_logging {
            init_logging_for(&layout)?;
        }

        let store_lock = StoreLock::acquire(layout.home_dir())?;
        let store = FilesystemStore::new(layout)?;

        let manager = Self::build(options, Arc::new(store), Some(store_lock));
        tracing::debug!(home_dir = %manager.inner.options.home_dir.display(), "Initialized resource manager");
        Ok(manager)
    }

    /// Create a manager over `options.home_dir` with default options otherwise.
    pub fn with_home(home_dir: impl Into<std::path::PathBuf>) -> JobscopeResult<Self> {
        Self::new(ManagerOptions::with_home(home_dir))
    }

    /// Create a manager over an injected store.
    ///
    /// No store lock is taken and `home_dir` is not touched; the store is
    /// responsible for its own storage.
    pub fn with_store(options: ManagerOptions, store: Arc<dyn ArtifactStore>) -> Self {
        Self::build(options, store, None)
    }

    fn build(
        options: ManagerOptions,
        store: Arc<dyn ArtifactStore>,
        store_lock: Option<StoreLock>,
    ) -> Self {
        let registry = ExecutionRegistry::new();
        let metrics = ManagerMetricsStorage::new();
        let engine = CleanupEngine::new(registry.clone(), Arc::clone(&store), metrics.clone());

        Self {
            inner: Arc::new(ManagerInner {
                options,
                registry,
                store,
                engine,
                metrics,
                _store_lock: store_lock,
            }),
        }
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.inner.options
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.inner.store
    }

    // ------------------------------------------------------------------------
    // Execution context
    // ------------------------------------------------------------------------

    /// Mint and register a new execution and bind it to the calling thread.
    pub fn begin_execution(&self, synchronous: bool) -> JobscopeResult<ExecutionId> {
        let id = self.create_execution(synchronous)?;
        context::set(id);
        Ok(id)
    }

    fn create_execution(&self, synchronous: bool) -> JobscopeResult<ExecutionId> {
        let id = self.inner.registry.create(synchronous)?;
        ManagerMetricsStorage::add(&self.inner.metrics.executions_started, 1);
        tracing::debug!(execution_id = %id, synchronous, "Began execution");
        Ok(id)
    }

    /// The execution bound to the calling task or thread.
    ///
    /// When nothing is bound and `create_if_absent` is set, a new execution
    /// (with `options.default_synchronous`) is created and bound.
    pub fn current_execution_id(&self, create_if_absent: bool) -> JobscopeResult<Option<ExecutionId>> {
        if let Some(id) = context::current() {
            return Ok(Some(id));
        }
        if !create_if_absent {
            return Ok(None);
        }
        self.begin_execution(self.inner.options.default_synchronous)
            .map(Some)
    }

    fn current_or_create(&self) -> JobscopeResult<ExecutionId> {
        self.current_execution_id(true)?.ok_or_else(|| {
            JobscopeError::Internal("no execution bound after implicit creation".into())
        })
    }

    /// Bind the calling thread to an existing execution until the guard drops.
    ///
    /// Used by worker-pool threads that continue an execution started elsewhere.
    pub fn bind_to_execution(&self, id: ExecutionId) -> JobscopeResult<ExecutionGuard> {
        self.inner.registry.require(&id)?;
        Ok(ExecutionGuard::enter(id))
    }

    /// Unbind the calling thread. The registry is not touched.
    pub fn clear_current(&self) -> Option<ExecutionId> {
        context::clear()
    }

    // ------------------------------------------------------------------------
    // Resources and artifacts
    // ------------------------------------------------------------------------

    /// Register a handle for deletion when the current execution is cleaned.
    pub fn register_temporary<H>(&self, handle: H) -> JobscopeResult<ExecutionId>
    where
        H: ResourceHandle + 'static,
    {
        let id = self.current_or_create()?;
        self.register_temporary_for(id, handle)?;
        Ok(id)
    }

    /// Register a handle against an explicit execution.
    pub fn register_temporary_for<H>(&self, id: ExecutionId, handle: H) -> JobscopeResult<()>
    where
        H: ResourceHandle + 'static,
    {
        let name = handle.name();
        self.inner.registry.register(&id, Box::new(handle))?;
        tracing::trace!(execution_id = %id, resource = %name, "Registered temporary resource");
        Ok(())
    }

    /// Create a uniquely named temporary artifact under the current execution
    /// and register it for cleanup.
    ///
    /// `extension` may be empty; a leading dot is ignored.
    pub fn open_temporary_artifact(&self, extension: &str) -> JobscopeResult<ArtifactHandle> {
        let id = self.current_or_create()?;
        // A stale binding must not leave directories behind.
        self.inner.registry.require(&id)?;

        let stem = Ulid::new().to_string().to_lowercase();
        let name = match extension.trim_start_matches('.') {
            "" => stem,
            ext => format!("{}.{}", stem, ext),
        };

        let handle = get_artifact(&self.inner.store, id, ArtifactKind::Temporary, Some(&name))?;
        self.inner.registry.register(&id, Box::new(handle.clone()))?;
        tracing::trace!(artifact = %handle.key(), "Opened temporary artifact");
        Ok(handle)
    }

    /// Resolve an output artifact. Outputs are not registered for cleanup.
    ///
    /// `execution_id` defaults to the current execution (created if absent).
    pub fn open_output_artifact(
        &self,
        execution_id: Option<ExecutionId>,
        name: &str,
    ) -> JobscopeResult<ArtifactHandle> {
        let id = match execution_id {
            Some(id) => id,
            None => self.current_or_create()?,
        };
        get_artifact(&self.inner.store, id, ArtifactKind::Output, Some(name))
    }

    /// The stored request of `execution_id`, if one was stored.
    pub fn stored_request(&self, execution_id: ExecutionId) -> JobscopeResult<Option<ArtifactHandle>> {
        ArtifactHandle::existing(Arc::clone(&self.inner.store), ArtifactKey::request(execution_id))
    }

    /// The stored response of `execution_id`, if one was stored.
    pub fn stored_response(&self, execution_id: ExecutionId) -> JobscopeResult<Option<ArtifactHandle>> {
        ArtifactHandle::existing(Arc::clone(&self.inner.store), ArtifactKey::response(execution_id))
    }

    /// Encode `document` and write it as the request of `execution_id`,
    /// replacing any previous one.
    pub fn store_request<D: Document>(
        &self,
        execution_id: ExecutionId,
        document: &D,
    ) -> JobscopeResult<ArtifactHandle> {
        self.store_document(ArtifactKey::request(execution_id), document)
    }

    /// Encode `document` and write it as the response of `execution_id`,
    /// replacing any previous one.
    pub fn store_response<D: Document>(
        &self,
        execution_id: ExecutionId,
        document: &D,
    ) -> JobscopeResult<ArtifactHandle> {
        self.store_document(ArtifactKey::response(execution_id), document)
    }

    fn store_document<D: Document>(&self, key: ArtifactKey, document: &D) -> JobscopeResult<ArtifactHandle> {
        let handle = ArtifactHandle::open(Arc::clone(&self.inner.store), key)?;
        handle.write_document(document)?;
        tracing::debug!(artifact = %handle.key(), "Stored document");
        Ok(handle)
    }

    /// Keep the sweep away from `execution_id`'s outputs until the guard drops.
    pub fn lock_outputs(&self, execution_id: ExecutionId) -> JobscopeResult<OutputLock> {
        let record = self.inner.registry.require(&execution_id)?;
        OutputLock::acquire(record)
    }

    // ------------------------------------------------------------------------
    // Lifecycle signals
    // ------------------------------------------------------------------------

    /// End of a request/response cycle on the calling thread.
    ///
    /// A synchronous execution is cleaned and evicted right away; an
    /// asynchronous one is left for [`execution_completed`](Self::execution_completed).
    /// The thread binding is cleared either way. Returns the cleanup report
    /// when a cleanup ran.
    pub fn unit_of_work_finished(&self) -> Option<CleanupReport> {
        let id = context::current()?;

        let report = match self.inner.registry.get(&id) {
            Ok(Some(record)) if record.is_synchronous() => {
                let report = self.inner.engine.cleanup_temporary(&id);
                if let Err(e) = self.inner.registry.evict(&id) {
                    tracing::warn!(execution_id = %id, error = %e, "Failed to evict execution");
                }
                tracing::debug!(execution_id = %id, "Finished synchronous execution");
                Some(report)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(execution_id = %id, error = %e, "Failed to look up execution");
                None
            }
        };

        context::clear();
        report
    }

    /// Completion signal for an asynchronous execution.
    ///
    /// Temporaries are deleted and the completion time recorded; the record
    /// stays until a sweep evicts it, so clients can still fetch outputs.
    pub fn execution_completed(&self, execution_id: ExecutionId) -> JobscopeResult<CleanupReport> {
        self.inner.registry.require(&execution_id)?;
        context::clear();

        let report = self.inner.engine.cleanup_temporary(&execution_id);
        if self.inner.registry.mark_complete(&execution_id)? {
            ManagerMetricsStorage::add(&self.inner.metrics.executions_completed, 1);
        }

        tracing::debug!(execution_id = %execution_id, deleted = report.deleted, "Execution completed");
        Ok(report)
    }

    /// Cancellation: delete temporaries and every stored artifact of the
    /// execution. Safe to repeat and safe after completion.
    pub fn execution_cancelled(&self, execution_id: ExecutionId) -> CleanupReport {
        let report = self.inner.engine.cleanup_all(&execution_id, true);

        // Completed records are eventually evicted by the sweep.
        let newly_completed = match self.inner.registry.mark_complete(&execution_id) {
            Ok(newly_set) => newly_set,
            Err(JobscopeError::UnknownExecution(_)) => false,
            Err(e) => {
                tracing::warn!(execution_id = %execution_id, error = %e, "Failed to mark cancelled execution");
                false
            }
        };

        // Repeats and unknown ids with nothing stored are not counted.
        if newly_completed || report.deleted > 0 || report.purged > 0 {
            ManagerMetricsStorage::add(&self.inner.metrics.executions_cancelled, 1);
        }

        tracing::debug!(
            execution_id = %execution_id,
            deleted = report.deleted,
            purged = report.purged,
            "Execution cancelled"
        );
        report
    }

    /// Process teardown: clean every execution's temporaries, then empty the
    /// registry. Outputs, requests and responses stay in the store.
    pub fn shutdown(&self) -> CleanupReport {
        let mut total = CleanupReport::default();

        let ids = match self.inner.registry.ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to snapshot registry at shutdown");
                return total;
            }
        };

        for id in &ids {
            let report = self.inner.engine.cleanup_temporary(id);
            total.deleted += report.deleted;
            total.failed += report.failed;
        }

        if let Err(e) = self.inner.registry.clear() {
            tracing::warn!(error = %e, "Failed to clear registry at shutdown");
        }
        context::clear();

        tracing::info!(
            executions = ids.len(),
            deleted = total.deleted,
            failed = total.failed,
            "Resource manager shut down"
        );
        total
    }

    // ------------------------------------------------------------------------
    // Sweep
    // ------------------------------------------------------------------------

    /// Remove artifacts of non-running executions older than `older_than`,
    /// then evict expired completed records.
    ///
    /// Executions still active in this manager count as running whatever
    /// `tracker` says.
    pub fn sweep(&self, older_than: DateTime<Utc>, tracker: &dyn StatusTracker) -> SweepReport {
        self.inner.engine.sweep(older_than, tracker)
    }

    /// Start the periodic sweeper on the current tokio runtime, using
    /// `options.sweep_interval_secs` and `options.retention_secs`.
    pub fn spawn_sweeper(&self, tracker: Arc<dyn StatusTracker>) -> SweeperHandle {
        SweeperHandle::spawn(
            self.inner.engine.clone(),
            tracker,
            self.inner.options.sweep_interval(),
            self.inner.options.retention(),
        )
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub fn get(&self, execution_id: &ExecutionId) -> JobscopeResult<Option<ExecutionInfo>> {
        Ok(self
            .inner
            .registry
            .get(execution_id)?
            .map(|record| record.to_info()))
    }

    /// All live executions, newest first.
    pub fn list(&self) -> JobscopeResult<Vec<ExecutionInfo>> {
        self.inner.registry.list()
    }

    /// Manager-wide counters. Monotonic, never reset.
    pub fn metrics(&self) -> ManagerMetrics {
        ManagerMetrics::new(self.inner.metrics.clone())
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("home_dir", &self.inner.options.home_dir)
            .field("store", &self.inner.store)
            .field("locked", &self.inner._store_lock.is_some())
            .finish()
    }
}

// ============================================================================
// THREAD SAFETY ASSERTIONS
// ============================================================================

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<ResourceManager>;
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RawDocument;
    use crate::resource::FileResource;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> ResourceManager {
        let mut options = ManagerOptions::with_home(temp_dir.path());
        options.file_logging = false;
        ResourceManager::new(options).unwrap()
    }

    #[test]
    fn test_current_execution_created_on_demand() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        context::clear();

        assert_eq!(manager.current_execution_id(false).unwrap(), None);
        let id = manager.current_execution_id(true).unwrap().unwrap();
        assert_eq!(manager.current_execution_id(false).unwrap(), Some(id));
        assert!(manager.get(&id).unwrap().unwrap().synchronous);

        manager.clear_current();
        assert!(manager.get(&id).unwrap().is_some());
    }

    #[test]
    fn test_bind_unknown_execution_fails() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        let err = manager.bind_to_execution(ExecutionId::generate()).unwrap_err();
        assert!(matches!(err, JobscopeError::UnknownExecution(_)));
    }

    #[test]
    fn test_temporary_artifact_is_registered() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let id = manager.begin_execution(true).unwrap();

        let artifact = manager.open_temporary_artifact(".gml").unwrap();
        artifact.write(b"<gml/>").unwrap();
        let path = artifact.local_path().unwrap();
        assert!(path.to_string_lossy().ends_with(".gml"));
        assert_eq!(manager.get(&id).unwrap().unwrap().temporary_count, 1);

        let report = manager.unit_of_work_finished().unwrap();
        assert_eq!(report.deleted, 1);
        assert!(!path.exists());
        assert!(manager.get(&id).unwrap().is_none());
    }

    #[test]
    fn test_invalid_extension_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        manager.begin_execution(true).unwrap();

        let err = manager.open_temporary_artifact("x/../../y").unwrap_err();
        assert!(matches!(err, JobscopeError::InvalidArtifactKey(_)));
        manager.clear_current();
    }

    #[test]
    fn test_stored_documents() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let id = manager.begin_execution(false).unwrap();
        manager.clear_current();

        assert!(manager.stored_request(id).unwrap().is_none());
        assert!(manager.stored_response(id).unwrap().is_none());

        manager.store_request(id, &RawDocument(b"<Execute/>".to_vec())).unwrap();
        let request = manager.stored_request(id).unwrap().unwrap();
        assert_eq!(request.read().unwrap(), b"<Execute/>");
        assert!(manager.stored_response(id).unwrap().is_none());
    }

    #[test]
    fn test_lock_outputs_guard() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let id = manager.begin_execution(false).unwrap();
        manager.clear_current();

        let lock = manager.lock_outputs(id).unwrap();
        assert!(manager.get(&id).unwrap().unwrap().outputs_locked);
        assert!(manager.lock_outputs(id).is_err());

        drop(lock);
        assert!(!manager.get(&id).unwrap().unwrap().outputs_locked);
    }

    #[test]
    fn test_completed_unknown_fails() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        let err = manager.execution_completed(ExecutionId::generate()).unwrap_err();
        assert!(matches!(err, JobscopeError::UnknownExecution(_)));
    }

    #[test]
    fn test_asynchronous_not_cleaned_at_unit_end() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let scratch = temp_dir.path().join("scratch.tmp");
        std::fs::write(&scratch, b"x").unwrap();

        let id = manager.begin_execution(false).unwrap();
        manager.register_temporary(FileResource::new(&scratch)).unwrap();

        assert!(manager.unit_of_work_finished().is_none());
        assert!(scratch.exists());
        assert_eq!(manager.current_execution_id(false).unwrap(), None);

        manager.execution_completed(id).unwrap();
        assert!(!scratch.exists());
        assert_eq!(manager.metrics().executions_completed_total(), 1);
    }

    #[test]
    fn test_second_manager_on_same_home_fails() {
        let temp_dir = TempDir::new().unwrap();
        let _first = manager(&temp_dir);

        let mut options = ManagerOptions::with_home(temp_dir.path());
        options.file_logging = false;
        let err = ResourceManager::new(options).unwrap_err();
        assert!(matches!(err, JobscopeError::Internal(_)));
    }
}
