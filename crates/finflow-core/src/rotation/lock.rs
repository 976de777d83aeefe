//! Per-secret rotation locks
//!
//! Rotations of the same secret are serialized inside the process by an async
//! mutex, and across processes by an exclusive lock on a file in the state
//! directory. The cross-process lock is not waited for: if another process
//! holds it the rotation fails with `Busy`.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::error::{RotationError, RotationResult};

static LOCAL_LOCKS: Lazy<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn local_lock(name: &str) -> Arc<AsyncMutex<()>> {
    LOCAL_LOCKS
        .lock()
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}

/// File name for `name`'s lock; anything outside `[A-Za-z0-9_-]` becomes `_`
pub fn lock_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("rotate-{}.lock", safe)
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Held for the duration of one rotation
#[derive(Debug)]
pub struct RotationGuard {
    _local: OwnedMutexGuard<()>,
    file: Option<(File, PathBuf)>,
}

impl RotationGuard {
    pub fn lock_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(_, path)| path.as_path())
    }
}

impl Drop for RotationGuard {
    fn drop(&mut self) {
        if let Some((file, _)) = &self.file {
            let _ = file.unlock();
        }
    }
}

/// Take the lock for `name`. With no `lock_dir` only the in-process lock is
/// used.
pub async fn acquire(name: &str, lock_dir: Option<&Path>) -> RotationResult<RotationGuard> {
    let local = local_lock(name).lock_owned().await;

    let file = match lock_dir {
        Some(dir) => {
            let path = dir.join(lock_file_name(name));
            let lock_err = |source| RotationError::Lock {
                path: path.clone(),
                source,
            };
            std::fs::create_dir_all(dir).map_err(lock_err)?;
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .open(&path)
                .map_err(lock_err)?;
            match file.try_lock_exclusive() {
                Ok(()) => Some((file, path)),
                Err(e) if is_contended(&e) => {
                    return Err(RotationError::Busy {
                        name: name.to_string(),
                    })
                }
                Err(e) => return Err(lock_err(e)),
            }
        }
        None => None,
    };

    Ok(RotationGuard { _local: local, file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_lock_file_name() {
        assert_eq!(lock_file_name("MONARCH_TOKEN"), "rotate-MONARCH_TOKEN.lock");
        assert_eq!(lock_file_name("a/b c"), "rotate-a_b_c.lock");
    }

    #[tokio::test]
    async fn test_other_holder_is_busy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(lock_file_name("LOCK_TEST_BUSY"));
        let other = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        other.lock_exclusive().unwrap();

        let err = acquire("LOCK_TEST_BUSY", Some(dir.path())).await.unwrap_err();
        assert!(matches!(err, RotationError::Busy { ref name } if name == "LOCK_TEST_BUSY"));

        other.unlock().unwrap();
        let guard = acquire("LOCK_TEST_BUSY", Some(dir.path())).await.unwrap();
        assert_eq!(guard.lock_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_released_on_drop() {
        let dir = tempdir().unwrap();
        let guard = acquire("LOCK_TEST_DROP", Some(dir.path())).await.unwrap();
        drop(guard);
        assert!(acquire("LOCK_TEST_DROP", Some(dir.path())).await.is_ok());
    }

    #[tokio::test]
    async fn test_same_process_waits() {
        let guard = acquire("LOCK_TEST_WAIT", None).await.unwrap();
        let waiter = tokio::spawn(async { acquire("LOCK_TEST_WAIT", None).await.map(|_| ()) });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap().unwrap();
    }
}
