//! Constants for the jobscope runtime
//!
//! Centralized location for environment variable names, defaults and file names.

pub mod envs {
    pub const JOBSCOPE_HOME: &str = "JOBSCOPE_HOME";
}

/// Defaults applied when options leave a value unset.
pub mod defaults {
    /// Age an unreferenced execution must reach before the sweep removes it.
    pub const RETENTION_SECS: u64 = 60 * 60;

    /// Period of the background sweeper.
    pub const SWEEP_INTERVAL_SECS: u64 = 10 * 60;

    /// Executions created implicitly from a thread context are synchronous.
    pub const SYNCHRONOUS: bool = true;
}

/// File naming patterns
pub mod filenames {
    /// Lock file name
    pub const LOCK_FILE: &str = ".lock";

    /// Rolling log file prefix inside logs/
    pub const LOG_FILE: &str = "jobscope.log";
}
