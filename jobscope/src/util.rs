//! Tracing setup.

use std::sync::OnceLock;

use jobscope_shared::errors::{JobscopeError, JobscopeResult};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::runtime::constants::filenames;
use crate::runtime::layout::FilesystemLayout;

/// Keeps the background log writer alive for the life of the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init();
}

/// Install a daily-rolling file subscriber writing to `{home}/logs/jobscope.log`.
///
/// Only the first call in a process installs anything; later calls (and calls
/// made after the host installed its own subscriber) are no-ops.
pub fn init_logging_for(layout: &FilesystemLayout) -> JobscopeResult<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| {
        JobscopeError::Config(format!(
            "failed to create logs dir {}: {}",
            logs_dir.display(),
            e
        ))
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, filenames::LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Lost the race to another caller: drop ours, theirs is installed.
    if LOG_GUARD.set(guard).is_err() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    register_to_tracing(non_blocking, env_filter);
    Ok(())
}
