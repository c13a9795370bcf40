//! Periodic background sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{CleanupEngine, retention_threshold};
use crate::status::StatusTracker;

/// Handle to a running sweeper task.
///
/// The first sweep runs immediately, then every `interval`. Dropping the
/// handle cancels the task; [`SweeperHandle::stop`] also waits for it.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Spawn on the current tokio runtime.
    pub(crate) fn spawn(
        engine: CleanupEngine,
        tracker: Arc<dyn StatusTracker>,
        interval: Duration,
        retention: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let engine = engine.clone();
                let tracker = Arc::clone(&tracker);
                let older_than = retention_threshold(retention);

                // Store I/O blocks; keep it off the async workers.
                let result =
                    tokio::task::spawn_blocking(move || engine.sweep(older_than, tracker.as_ref()))
                        .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Sweep task failed");
                }
            }

            tracing::debug!("Sweeper stopped");
        });

        tracing::debug!(interval_secs = interval.as_secs(), retention_secs = retention.as_secs(), "Started sweeper");
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Cancel the sweeper and wait for an in-flight sweep to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
