// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path builders for runner scratch files (§4.1 System Overview: "everything
//! transient ... lives in a scratch directory outside the repository";
//! §5 "External scratch: `/tmp/prloom-<planId>/worker.log`, ...").
//!
//! Two distinct scratch locations exist:
//! - an external directory, keyed only by plan id, holding the live
//!   log/exitcode/prompt files a detached adapter writes to;
//! - a worktree-local directory where triage/review agents leave their
//!   result JSON for the runner to read back (§4.3: "reads
//!   `triage-result.json` from the worktree's scratch dir").

use std::path::{Path, PathBuf};

/// `<scratch_root>/<planId>/`, keyed only by plan id (§5). At most one
/// runner per plan ever touches this directory (§3 invariant 2), so no
/// locking is needed.
#[derive(Debug, Clone)]
pub struct ScratchPaths {
    dir: PathBuf,
}

impl ScratchPaths {
    /// `scratch_root` is normally `/tmp` but is a parameter so tests can
    /// point it at a tempdir.
    pub fn new(scratch_root: &Path, plan_id: &str) -> Self {
        Self {
            dir: scratch_root.join(format!("prloom-{plan_id}")),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}.log"))
    }

    pub fn exitcode(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}.exitcode"))
    }

    pub fn prompt(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}.prompt"))
    }
}

/// The worktree-local scratch dir a triage/review agent writes its result
/// file into: `<worktree>/prloom/.local/scratch/`.
pub fn worktree_scratch_dir(worktree: &Path) -> PathBuf {
    worktree.join("prloom").join(".local").join("scratch")
}

pub fn triage_result_path(worktree: &Path) -> PathBuf {
    worktree_scratch_dir(worktree).join("triage-result.json")
}

pub fn review_result_path(worktree: &Path) -> PathBuf {
    worktree_scratch_dir(worktree).join("review-result.json")
}

pub fn commit_review_result_path(worktree: &Path) -> PathBuf {
    worktree_scratch_dir(worktree).join("commit-review-result.json")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
