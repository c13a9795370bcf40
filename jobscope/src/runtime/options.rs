//! Configuration for the resource manager.

use crate::runtime::constants::{defaults, envs as const_envs};
use crate::runtime::layout::dirs as const_dirs;
use dirs::home_dir;
use jobscope_shared::errors::{JobscopeError, JobscopeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options used when constructing a [`ResourceManager`](crate::ResourceManager).
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```json
/// { "home_dir": "/srv/jobscope", "retention_secs": 7200 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// Store home. Must be an absolute path.
    pub home_dir: PathBuf,

    /// Age (seconds) an execution's artifacts must reach before the sweep
    /// may remove them.
    pub retention_secs: u64,

    /// Period (seconds) of the background sweeper.
    pub sweep_interval_secs: u64,

    /// Synchronous flag for executions created implicitly by
    /// `current_execution_id(true)`.
    pub default_synchronous: bool,

    /// Install the rolling-file tracing subscriber under `{home}/logs`.
    pub file_logging: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        let home_dir = std::env::var(const_envs::JOBSCOPE_HOME)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
                path.push(const_dirs::JOBSCOPE_DIR);
                path
            });

        Self {
            home_dir,
            retention_secs: defaults::RETENTION_SECS,
            sweep_interval_secs: defaults::SWEEP_INTERVAL_SECS,
            default_synchronous: defaults::SYNCHRONOUS,
            file_logging: true,
        }
    }
}

impl ManagerOptions {
    /// Options rooted at `home_dir`, everything else default.
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            ..Default::default()
        }
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> JobscopeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            JobscopeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&raw).map_err(|e| {
            JobscopeError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check preconditions before any filesystem work happens.
    pub fn validate(&self) -> JobscopeResult<()> {
        if !self.home_dir.is_absolute() {
            return Err(JobscopeError::Config(format!(
                "home_dir must be absolute path, got: {}",
                self.home_dir.display()
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(JobscopeError::Config(
                "sweep_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = ManagerOptions::with_home("/srv/jobscope");

        assert_eq!(options.retention_secs, 3600);
        assert_eq!(options.sweep_interval(), Duration::from_secs(600));
        assert!(options.default_synchronous);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_relative_home_rejected() {
        let options = ManagerOptions::with_home("relative/home");

        let err = options.validate().unwrap_err();
        assert!(matches!(err, JobscopeError::Config(_)));
        assert!(err.to_string().contains("must be absolute"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let options = ManagerOptions {
            sweep_interval_secs: 0,
            ..ManagerOptions::with_home("/srv/jobscope")
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jobscope.json");
        std::fs::write(
            &path,
            r#"{ "home_dir": "/srv/jobscope", "retention_secs": 120, "file_logging": false }"#,
        )
        .unwrap();

        let options = ManagerOptions::from_file(&path).unwrap();
        assert_eq!(options.home_dir, PathBuf::from("/srv/jobscope"));
        assert_eq!(options.retention(), Duration::from_secs(120));
        assert!(!options.file_logging);
        assert_eq!(options.sweep_interval_secs, 600);
    }

    #[test]
    fn test_from_file_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ManagerOptions::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
