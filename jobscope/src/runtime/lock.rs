//! Store lock preventing two managers from owning the same store home.
//!
//! Uses file locking (flock) so that only one manager (or the operator CLI)
//! sweeps and purges a given JOBSCOPE_HOME at a time.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use jobscope_shared::errors::{JobscopeError, JobscopeResult};

use crate::runtime::constants::filenames;

/// A lock guard that holds an exclusive lock on the store home.
///
/// The lock is automatically released when this guard is dropped,
/// or when the process exits/crashes.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Attempt to acquire an exclusive lock on the store home.
    ///
    /// # Returns
    /// * `Ok(StoreLock)` - Successfully acquired lock
    /// * `Err(...)` - Another manager is already using this directory
    pub fn acquire(home_dir: &Path) -> JobscopeResult<Self> {
        std::fs::create_dir_all(home_dir).map_err(|e| {
            JobscopeError::ArtifactStore(format!("failed to create home dir: {}", e))
        })?;

        let lock_path = home_dir.join(filenames::LOCK_FILE);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| JobscopeError::ArtifactStore(format!("failed to open lock file: {}", e)))?;

        if let Err(e) = flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
            return Err(match e.kind() {
                ErrorKind::WouldBlock => JobscopeError::Internal(format!(
                    "Another jobscope manager is already using directory: {}\n\
                     Only one manager instance can own a JOBSCOPE_HOME directory at a time.",
                    home_dir.display()
                )),
                _ => JobscopeError::ArtifactStore(format!(
                    "failed to lock {}: {}",
                    lock_path.display(),
                    e
                )),
            });
        }

        tracing::debug!(lock_path = %lock_path.display(), "Acquired store lock");

        Ok(StoreLock {
            file,
            path: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = flock(&self.file, libc::LOCK_UN) {
            tracing::warn!(lock_path = %self.path.display(), error = %e, "Failed to release store lock");
            return;
        }
        tracing::debug!(lock_path = %self.path.display(), "Released store lock");
    }
}

fn flock(file: &File, operation: libc::c_int) -> std::io::Result<()> {
    // SAFETY: the descriptor is owned by `file` and open for the whole call.
    let result = unsafe { libc::flock(file.as_raw_fd(), operation) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_lock() {
        let temp_dir = TempDir::new().unwrap();
        let lock = StoreLock::acquire(temp_dir.path()).unwrap();

        assert!(lock.path().exists());
        assert_eq!(lock.path(), temp_dir.path().join(".lock"));
    }

    #[test]
    fn test_lock_prevents_second_owner() {
        let temp_dir = TempDir::new().unwrap();

        let _lock1 = StoreLock::acquire(temp_dir.path()).unwrap();

        let result = StoreLock::acquire(temp_dir.path());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Another jobscope manager")
        );
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp_dir = TempDir::new().unwrap();

        {
            let _lock = StoreLock::acquire(temp_dir.path()).unwrap();
        }

        let _lock2 = StoreLock::acquire(temp_dir.path()).unwrap();
    }

    #[test]
    fn test_lock_across_threads() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = Arc::new(temp_dir.path().to_path_buf());

        let _lock1 = StoreLock::acquire(&dir_path).unwrap();

        let dir_clone = Arc::clone(&dir_path);
        let handle = thread::spawn(move || StoreLock::acquire(&dir_clone));

        assert!(handle.join().unwrap().is_err());
    }

    #[test]
    fn test_creates_missing_home() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("nested").join("home");

        let lock = StoreLock::acquire(&home).unwrap();
        assert!(home.is_dir());
        assert!(lock.path().starts_with(&home));
    }
}
