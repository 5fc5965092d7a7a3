//! Data directory lock
//!
//! One `DiskStore` per data directory. A second open, from this process or
//! another, fails instead of racing the owner's WAL and segment ids.
//!
//! Uses `fs2` advisory locks (flock on Unix, LockFile on Windows) on
//! `{data_dir}/LOCK`. The lock belongs to the open file description, so a
//! second handle inside the same process is refused too.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{BlockStoreError, Result};

/// Exclusive lock on a data directory, released on drop
pub struct DirLock {
    /// Kept open to hold the lock
    file: File,
    path: PathBuf,
}

impl DirLock {
    pub const LOCK_FILE: &'static str = "LOCK";

    /// Take the lock without blocking
    ///
    /// Fails with `Locked` when another handle holds it.
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(Self::LOCK_FILE);

        // No truncate here: the holder's pid must survive a failed attempt
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(BlockStoreError::Locked {
                pid: Self::read_holder_pid(&path),
                path,
            });
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        tracing::debug!(path = %path.display(), "data directory locked");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_holder_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        // The file stays; removing it would let a new opener lock an unlinked inode
        let _ = self.file.unlock();
    }
}
