//! Dot-lock files guarding archive destinations.
//!
//! Taking the lock for `samples_1.mbox` atomically creates
//! `samples_1.mbox.lock` (create-new semantics) holding the owner's PID.
//! A second writer, in this or any other process, fails to create it and
//! backs off. The lock is released when the guard is dropped, which covers
//! normal completion, early `?` returns and unwinding.

use crate::error::{Result, SampleError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Exclusive hold on an archive path; removed on drop.
#[derive(Debug)]
pub struct ArchiveLock {
    target: PathBuf,
    lock_path: PathBuf,
}

impl ArchiveLock {
    /// Acquire the lock for `target`.
    ///
    /// # Errors
    /// [`SampleError::Locked`] if another holder exists, [`SampleError::Io`]
    /// for any other failure creating the lock file.
    pub fn acquire(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let lock_path = lock_path_for(&target);
        match create_lock_file(&lock_path) {
            Ok(()) => {
                tracing::debug!(lock = %lock_path.display(), "archive lock acquired");
                Ok(Self { target, lock_path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(SampleError::Locked {
                path: target,
                lock: lock_path,
            }),
            Err(e) => Err(SampleError::io(&lock_path, e)),
        }
    }

    /// The archive this lock protects.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            tracing::warn!(lock = %self.lock_path.display(), error = %e, "failed to release archive lock");
        }
    }
}

/// `<target>.lock`, next to the target.
#[must_use]
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut p = target.as_os_str().to_os_string();
    p.push(".lock");
    PathBuf::from(p)
}

fn create_lock_file(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = writeln!(file, "{}", std::process::id()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}
