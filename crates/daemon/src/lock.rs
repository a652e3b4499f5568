// SPDX-License-Identifier: MIT

//! Single-instance guard: an exclusive advisory lock on
//! `<project-store>/daemon.lock`, so two daemons never open the same
//! schedule store at once (spec.md §5's "single writer" assumption).

use crate::error::LifecycleError;
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Holds the lock for the daemon's lifetime; dropping it releases the lock.
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

impl DaemonLock {
    /// Acquires the exclusive lock at `<project_store>/daemon.lock`,
    /// creating the file if needed and writing this process's PID.
    pub fn acquire(project_store: &Path) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(project_store)?;
        let path = project_store.join("daemon.lock");

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "lock acquisition failed");
            LifecycleError::LockHeld(path.clone())
        })?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
