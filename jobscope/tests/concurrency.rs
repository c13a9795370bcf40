//! Integration tests for context propagation and concurrent registration.

use std::sync::{Arc, Barrier};
use std::thread;

use jobscope::execution::context;
use jobscope::{ExecutionId, ResourceManager};
use jobscope_test_utils::{CountingHandle, TestStore};

const THREADS: usize = 8;
const PER_THREAD: usize = 125;

#[test]
fn test_concurrent_registration_no_lost_updates() {
    let store = TestStore::new();
    let manager = store.manager.clone();
    let id = manager.begin_execution(false).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = manager.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _guard = manager.bind_to_execution(id).unwrap();
                barrier.wait();
                (0..PER_THREAD)
                    .map(|i| {
                        let handle = CountingHandle::new(format!("t{t}-{i}"));
                        assert_eq!(manager.register_temporary(handle.clone()).unwrap(), id);
                        handle
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let probes: Vec<CountingHandle> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();

    assert_eq!(
        manager.get(&id).unwrap().unwrap().temporary_count,
        THREADS * PER_THREAD
    );

    let report = manager.execution_completed(id).unwrap();
    assert_eq!(report.deleted, THREADS * PER_THREAD);
    assert!(probes.iter().all(|p| p.delete_count() == 1));
}

#[test]
fn test_binding_not_visible_across_threads() {
    let store = TestStore::new();
    let id = store.manager.begin_execution(true).unwrap();

    let seen = thread::spawn(context::current).join().unwrap();

    assert_eq!(seen, None);
    assert_eq!(context::current(), Some(id));
    store.manager.clear_current();
}

#[test]
fn test_guard_restores_previous_binding() {
    let store = TestStore::new();
    let manager = &store.manager;
    let outer = manager.begin_execution(false).unwrap();
    let inner = manager.begin_execution(false).unwrap();
    manager.clear_current();

    let _outer_guard = manager.bind_to_execution(outer).unwrap();
    {
        let guard = manager.bind_to_execution(inner).unwrap();
        assert_eq!(guard.execution_id(), inner);
        assert_eq!(context::current(), Some(inner));
    }
    assert_eq!(context::current(), Some(outer));
}

#[test]
fn test_propagate_to_pool_thread() {
    let store = TestStore::new();
    let manager = store.manager.clone();
    let id = manager.begin_execution(false).unwrap();
    let probe = CountingHandle::new("from-pool");

    let job = {
        let manager = manager.clone();
        let probe = probe.clone();
        context::propagate(move || manager.register_temporary(probe))
    };
    let registered = thread::spawn(job).join().unwrap().unwrap();

    assert_eq!(registered, id);
    manager.execution_completed(id).unwrap();
    assert!(probe.deleted());
}

#[test]
fn test_unbinding_deletes_nothing() {
    let store = TestStore::new();
    let manager = &store.manager;
    let id = manager.begin_execution(true).unwrap();
    let probe = CountingHandle::new("kept");
    manager.register_temporary(probe.clone()).unwrap();

    assert_eq!(manager.clear_current(), Some(id));

    assert!(!probe.deleted());
    assert_eq!(manager.get(&id).unwrap().unwrap().temporary_count, 1);
    // Nothing bound: the unit-of-work hook has nothing to clean.
    assert!(manager.unit_of_work_finished().is_none());
}

async fn register_after_yield(manager: ResourceManager, probe: CountingHandle) -> ExecutionId {
    tokio::task::yield_now().await;
    manager.register_temporary(probe).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_task_scope_follows_task_across_workers() {
    let store = TestStore::new();
    let manager = store.manager.clone();

    let ids: Vec<ExecutionId> = (0..4)
        .map(|_| {
            let id = manager.begin_execution(false).unwrap();
            manager.clear_current();
            id
        })
        .collect();

    let tasks: Vec<_> = ids
        .iter()
        .map(|&id| {
            let manager = manager.clone();
            let probe = CountingHandle::new(id.to_string());
            tokio::spawn(context::scope(id, register_after_yield(manager, probe)))
        })
        .collect();

    for (task, id) in tasks.into_iter().zip(&ids) {
        assert_eq!(task.await.unwrap(), *id);
    }
    for id in &ids {
        assert_eq!(manager.get(id).unwrap().unwrap().temporary_count, 1);
    }
}

#[test]
fn test_independent_executions_in_parallel() {
    let store = TestStore::new();
    let manager = store.manager.clone();

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || {
                let id = manager.begin_execution(true).unwrap();
                let probe = CountingHandle::new("scratch");
                manager.register_temporary(probe.clone()).unwrap();
                let report = manager.unit_of_work_finished().unwrap();
                (id, probe, report.deleted)
            })
        })
        .collect();

    for worker in workers {
        let (id, probe, deleted) = worker.join().unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(probe.delete_count(), 1);
        assert!(manager.get(&id).unwrap().is_none());
    }
    assert_eq!(manager.metrics().executions_started_total(), THREADS as u64);
}
