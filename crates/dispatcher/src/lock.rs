// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-repo exclusive lock at `.prloom/repo.lock` (§5 "Shared-resource
//! policy": "No other writer is permitted to exist because the dispatcher
//! holds a per-repo file lock"). Grounded on the teacher's daemon lock file
//! (`lifecycle.rs`): open without truncating, lock first, only then write
//! the holder's pid, and release on drop.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::DispatcherError;

/// Holds the advisory exclusive lock on `.prloom/repo.lock` for as long as
/// this value is alive. There is intentionally no explicit `unlock` method —
/// `Drop` releases it, which also covers the panic-unwind case.
pub struct RepoLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Acquire the lock, failing immediately rather than blocking — a
    /// second dispatcher instance against the same repo should get a clear
    /// error, not hang.
    pub fn acquire(path: &Path) -> Result<Self, DispatcherError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| DispatcherError::LockFailed(path.to_path_buf(), e))?;

        file.try_lock_exclusive()
            .map_err(|e| DispatcherError::LockFailed(path.to_path_buf(), e))?;

        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { file, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
