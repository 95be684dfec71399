//! Lock-file naming and the advisory on-disk table lock.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::error;

/// Extension of the per-table advisory lock file.
pub const LOCK_FILE_EXTENSION: &str = "lock";

/// Path of the lock file guarding `table` under `root`.
pub fn lock_path(root: &Path, table: &str) -> PathBuf {
    root.join(format!("{table}.{LOCK_FILE_EXTENSION}"))
}

/// An exclusively held advisory lock on a table name.
///
/// The open file handle is the lock: dropping the handle releases it.
/// Exclusion spans processes (and separate opens within one process), which
/// is what extends the pool's single-writer invariant beyond this process.
#[derive(Debug)]
pub struct TableLock {
    file: File,
    path: PathBuf,
}

impl TableLock {
    /// Creates the lock file if needed and attempts a non-blocking exclusive
    /// lock on it. Fails when another handle, in this process or any other,
    /// already holds the lock.
    pub fn acquire(path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock and removes the lock file from disk, freeing the
    /// name for re-creation by any process. Removal failure is logged, not
    /// propagated; the lock itself is always released.
    pub fn release_and_remove(self) {
        let path = self.path.clone();
        let _ = FileExt::unlock(&self.file);
        drop(self.file);
        if let Err(err) = fs::remove_file(&path) {
            error!(path = %path.display(), %err, "could not remove lock file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_uses_table_name() {
        let path = lock_path(Path::new("/db"), "trades");
        assert_eq!(path, PathBuf::from("/db/trades.lock"));
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = TempDir::new().expect("tempdir");
        let path = lock_path(dir.path(), "t1");
        let held = TableLock::acquire(path.clone()).expect("first lock");
        assert!(TableLock::acquire(path.clone()).is_err());
        drop(held);
        let reacquired = TableLock::acquire(path).expect("lock after release");
        drop(reacquired);
    }

    #[test]
    fn release_and_remove_deletes_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = lock_path(dir.path(), "t1");
        let lock = TableLock::acquire(path.clone()).expect("lock");
        assert!(path.exists());
        lock.release_and_remove();
        assert!(!path.exists());
    }
}
