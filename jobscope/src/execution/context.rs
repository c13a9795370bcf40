//! Current-execution context propagation.
//!
//! Each thread carries an optional "current execution" slot. A tokio
//! task-local binding installed with [`scope`] takes precedence over the thread
//! slot, so async code keeps its execution while hopping between workers.
//!
//! Worker pools that are not spawned from the request thread must bind
//! explicitly, either through `ResourceManager::bind_to_execution` or by
//! wrapping the job with [`propagate`]. Nothing here touches the registry:
//! unbinding never deletes anything.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

use super::id::ExecutionId;

thread_local! {
    static CURRENT_EXECUTION: RefCell<Option<ExecutionId>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_EXECUTION: ExecutionId;
}

/// Execution bound to the calling task or thread, if any.
pub fn current() -> Option<ExecutionId> {
    TASK_EXECUTION
        .try_with(|id| *id)
        .ok()
        .or_else(|| CURRENT_EXECUTION.with(|c| *c.borrow()))
}

/// Bind the calling thread, returning the previous binding.
pub(crate) fn set(id: ExecutionId) -> Option<ExecutionId> {
    CURRENT_EXECUTION.with(|c| c.borrow_mut().replace(id))
}

/// Unbind the calling thread, returning what was bound.
pub fn clear() -> Option<ExecutionId> {
    CURRENT_EXECUTION.with(|c| c.borrow_mut().take())
}

/// Thread binding that restores the previous binding when dropped.
///
/// Not `Send`: the binding belongs to the thread that created it.
#[must_use = "the binding is released when the guard is dropped"]
#[derive(Debug)]
pub struct ExecutionGuard {
    execution_id: ExecutionId,
    previous: Option<ExecutionId>,
    _not_send: PhantomData<*const ()>,
}

impl ExecutionGuard {
    pub(crate) fn enter(execution_id: ExecutionId) -> Self {
        let previous = set(execution_id);
        Self {
            execution_id,
            previous,
            _not_send: PhantomData,
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        match self.previous {
            Some(previous) => {
                set(previous);
            }
            None => {
                clear();
            }
        }
    }
}

/// Run `future` with `id` as its task-local execution.
pub async fn scope<F>(id: ExecutionId, future: F) -> F::Output
where
    F: Future,
{
    TASK_EXECUTION.scope(id, future).await
}

/// Capture the caller's execution so a job submitted to a thread pool runs
/// bound to it.
///
/// ```
/// use jobscope::execution::context;
///
/// let job = context::propagate(|| context::current());
/// let seen = std::thread::spawn(job).join().unwrap();
/// assert_eq!(seen, context::current());
/// ```
pub fn propagate<F, R>(f: F) -> impl FnOnce() -> R + Send + 'static
where
    F: FnOnce() -> R + Send + 'static,
{
    let captured = current();
    move || {
        let _guard = captured.map(ExecutionGuard::enter);
        f()
    }
}
