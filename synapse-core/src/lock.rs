//! Cross-process advisory lock guarding the hot/cold weight files.
//!
//! Acquisition creates `.observer.lock` exclusively; on failure it sleeps
//! briefly and retries, and gives up rather than blocking indefinitely. An
//! OS-level advisory lock would be preferable, but a sentinel file is an
//! acceptable, if race-prone, equivalent provided retry-with-backoff is
//! used — which is what this type does.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::constants::{LOCK_MAX_RETRIES, LOCK_RETRY_DELAY};
use crate::error::{Error, Result};

/// A held advisory lock. The lock file is removed on drop, guaranteeing
/// release on every exit path (success, error, early return, panic unwind).
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Attempt to acquire the lock, retrying up to `LOCK_MAX_RETRIES` times
    /// with a fixed `LOCK_RETRY_DELAY` between attempts. Returns
    /// `Error::LockContention` if the lock could not be acquired — callers
    /// must treat this as "abandon the mutation and log", never as a reason
    /// to block indefinitely.
    pub async fn acquire(path: &Path) -> Result<Self> {
        for attempt in 0..=LOCK_MAX_RETRIES {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt == LOCK_MAX_RETRIES {
                        warn!(path = %path.display(), "lock acquisition exhausted retries");
                        return Err(Error::LockContention(path.display().to_string()));
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Err(Error::LockContention(path.display().to_string()))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to release lock file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_then_release_allows_reacquire() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".observer.lock");
        {
            let _lock = FileLock::acquire(&lock_path).await.unwrap();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
        let _lock2 = FileLock::acquire(&lock_path).await.unwrap();
    }

    #[tokio::test]
    async fn second_writer_is_rejected_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".observer.lock");
        let _first = FileLock::acquire(&lock_path).await.unwrap();
        let second = FileLock::acquire(&lock_path).await;
        assert!(second.is_err());
    }
}
