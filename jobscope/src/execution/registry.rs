//! Thread-safe execution registry implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use jobscope_shared::errors::{JobscopeError, JobscopeResult};

use super::id::ExecutionId;
use super::state::{ExecutionInfo, ExecutionResources};
use crate::resource::ResourceHandle;

/// Thread-safe registry of live executions.
///
/// Shared between the facade and the cleanup engine via Arc<>.
/// The map is behind a RwLock; each record guards its own temporary list, so
/// concurrent registrations against one execution only take the read lock.
///
/// # Design
///
/// - **Shared ownership**: Cloneable via `Arc`
/// - **Concurrent access**: RwLock for the map, per-record mutex for handles
/// - **No persistence**: In-memory only; durable state lives in the artifact store
#[derive(Clone, Debug, Default)]
pub struct ExecutionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    executions: HashMap<ExecutionId, Arc<ExecutionResources>>,
}

impl ExecutionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh execution id and register an empty record for it.
    pub fn create(&self, synchronous: bool) -> JobscopeResult<ExecutionId> {
        let id = ExecutionId::generate();
        self.insert(id, synchronous)?;
        Ok(id)
    }

    /// Register an empty record under a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Returns error if an execution with this id already exists.
    pub fn insert(&self, id: ExecutionId, synchronous: bool) -> JobscopeResult<Arc<ExecutionResources>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        if inner.executions.contains_key(&id) {
            return Err(JobscopeError::Internal(format!(
                "execution {} already registered",
                id
            )));
        }

        tracing::debug!(execution_id = %id, synchronous, "Registering execution");
        let record = Arc::new(ExecutionResources::new(id, synchronous));
        inner.executions.insert(id, Arc::clone(&record));
        Ok(record)
    }

    /// Get the record for a specific execution.
    ///
    /// Returns `Ok(None)` if the execution doesn't exist.
    pub fn get(&self, id: &ExecutionId) -> JobscopeResult<Option<Arc<ExecutionResources>>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        Ok(inner.executions.get(id).cloned())
    }

    /// Get the record, failing if the execution is unknown.
    pub fn require(&self, id: &ExecutionId) -> JobscopeResult<Arc<ExecutionResources>> {
        self.get(id)?
            .ok_or_else(|| JobscopeError::UnknownExecution(id.to_string()))
    }

    /// Append a temporary resource handle to an execution.
    ///
    /// # Errors
    ///
    /// Returns `UnknownExecution` if the execution doesn't exist; the
    /// registry is left untouched.
    pub fn register(&self, id: &ExecutionId, handle: Box<dyn ResourceHandle>) -> JobscopeResult<()> {
        let inner = self
            .inner
            .read()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        let record = inner
            .executions
            .get(id)
            .ok_or_else(|| JobscopeError::UnknownExecution(id.to_string()))?;

        tracing::trace!(execution_id = %id, resource = %handle.name(), "Registering temporary resource");
        record.push_temporary(handle);
        Ok(())
    }

    /// Take every temporary handle registered for `id`.
    ///
    /// Returns `Ok(None)` if the execution doesn't exist.
    pub fn drain_temporary(
        &self,
        id: &ExecutionId,
    ) -> JobscopeResult<Option<Vec<Box<dyn ResourceHandle>>>> {
        Ok(self.get(id)?.map(|record| record.take_temporary()))
    }

    /// Record the completion time of an execution.
    ///
    /// Returns `Ok(false)` if completion was already recorded.
    pub fn mark_complete(&self, id: &ExecutionId) -> JobscopeResult<bool> {
        let record = self.require(id)?;
        let newly_set = record.mark_complete(Utc::now());
        if newly_set {
            tracing::debug!(execution_id = %id, "Marked execution complete");
        } else {
            tracing::trace!(execution_id = %id, "Execution already marked complete");
        }
        Ok(newly_set)
    }

    /// Remove an execution from the registry.
    ///
    /// Returns the evicted record, or `Ok(None)` if it was not present.
    pub fn evict(&self, id: &ExecutionId) -> JobscopeResult<Option<Arc<ExecutionResources>>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        let evicted = inner.executions.remove(id);
        if evicted.is_some() {
            tracing::debug!(execution_id = %id, "Evicted execution from registry");
        }
        Ok(evicted)
    }

    /// Snapshot of every registered execution id.
    pub fn ids(&self) -> JobscopeResult<Vec<ExecutionId>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        Ok(inner.executions.keys().copied().collect())
    }

    /// Snapshot of every record, for passes that must not hold the lock.
    pub fn records(&self) -> JobscopeResult<Vec<Arc<ExecutionResources>>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        Ok(inner.executions.values().cloned().collect())
    }

    /// List all executions, sorted by creation time (newest first).
    pub fn list(&self) -> JobscopeResult<Vec<ExecutionInfo>> {
        let mut infos: Vec<ExecutionInfo> =
            self.records()?.iter().map(|r| r.to_info()).collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    /// Remove every execution, returning the removed records.
    pub fn clear(&self) -> JobscopeResult<Vec<Arc<ExecutionResources>>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        Ok(inner.executions.drain().map(|(_, record)| record).collect())
    }

    /// Get the number of executions being tracked.
    pub fn count(&self) -> JobscopeResult<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|e| JobscopeError::Internal(format!("registry lock poisoned: {}", e)))?;

        Ok(inner.executions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FileResource;
    use std::thread;

    fn handle(name: &str) -> Box<dyn ResourceHandle> {
        Box::new(FileResource::new(format!("/nonexistent/{name}")))
    }

    #[test]
    fn test_create_and_get() {
        let registry = ExecutionRegistry::new();
        let id = registry.create(true).unwrap();

        let record = registry.get(&id).unwrap().unwrap();
        assert_eq!(record.id(), id);
        assert!(record.is_synchronous());
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let registry = ExecutionRegistry::new();
        let id = ExecutionId::generate();

        registry.insert(id, false).unwrap();
        let result = registry.insert(id, false);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("already registered")
        );
    }

    #[test]
    fn test_register_unknown_fails_without_mutation() {
        let registry = ExecutionRegistry::new();
        registry.create(true).unwrap();

        let stray = ExecutionId::generate();
        let err = registry.register(&stray, handle("a")).unwrap_err();

        assert!(matches!(err, JobscopeError::UnknownExecution(_)));
        assert_eq!(registry.count().unwrap(), 1);
        assert!(registry.get(&stray).unwrap().is_none());
    }

    #[test]
    fn test_register_and_drain() {
        let registry = ExecutionRegistry::new();
        let id = registry.create(false).unwrap();

        registry.register(&id, handle("a")).unwrap();
        registry.register(&id, handle("b")).unwrap();

        let drained = registry.drain_temporary(&id).unwrap().unwrap();
        let names: Vec<String> = drained.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["/nonexistent/a", "/nonexistent/b"]);

        assert!(registry.drain_temporary(&id).unwrap().unwrap().is_empty());
        assert!(registry.drain_temporary(&ExecutionId::generate()).unwrap().is_none());
    }

    #[test]
    fn test_mark_complete_once() {
        let registry = ExecutionRegistry::new();
        let id = registry.create(false).unwrap();

        assert!(registry.mark_complete(&id).unwrap());
        let first = registry.get(&id).unwrap().unwrap().completed_at();
        assert!(!registry.mark_complete(&id).unwrap());
        assert_eq!(registry.get(&id).unwrap().unwrap().completed_at(), first);
    }

    #[test]
    fn test_mark_complete_unknown() {
        let registry = ExecutionRegistry::new();
        let err = registry.mark_complete(&ExecutionId::generate()).unwrap_err();
        assert!(matches!(err, JobscopeError::UnknownExecution(_)));
    }

    #[test]
    fn test_evict() {
        let registry = ExecutionRegistry::new();
        let id = registry.create(true).unwrap();

        assert!(registry.evict(&id).unwrap().is_some());
        assert!(registry.get(&id).unwrap().is_none());
        assert!(registry.evict(&id).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let registry = ExecutionRegistry::new();
        let first = registry.create(true).unwrap();
        thread::sleep(std::time::Duration::from_millis(5));
        let second = registry.create(true).unwrap();

        let infos = registry.list().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].id, second);
        assert_eq!(infos[1].id, first);
    }

    #[test]
    fn test_concurrent_register_no_lost_updates() {
        let registry = ExecutionRegistry::new();
        let id = registry.create(false).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        registry.register(&id, handle(&format!("{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.get(&id).unwrap().unwrap().temporary_count(), 2000);
    }

    #[test]
    fn test_clear() {
        let registry = ExecutionRegistry::new();
        registry.create(true).unwrap();
        registry.create(false).unwrap();

        assert_eq!(registry.clear().unwrap().len(), 2);
        assert_eq!(registry.count().unwrap(), 0);
    }
}
