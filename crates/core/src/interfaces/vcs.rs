// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `VCS`: the repository operations the dispatcher needs (§6). Concrete
//! implementations (a real `git` shell-out, libgit2, …) live outside this
//! crate entirely.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("branch already exists: {0}")]
    BranchExists(String),
    #[error("worktree creation failed: {0}")]
    WorktreeFailed(String),
    #[error("commit failed: {0}")]
    CommitFailed(String),
    #[error("push failed: {0}")]
    PushFailed(String),
    #[error("rebase failed: {0}")]
    RebaseFailed(String),
    #[error("no such branch: {0}")]
    NoSuchBranch(String),
}

/// Result of attempting to rebase a plan's branch onto its base (§4.3
/// "Triage step", §4.1 "Per-plan advancement").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseOutcome {
    pub success: bool,
    pub has_conflicts: bool,
    pub conflict_files: Vec<String>,
}

impl RebaseOutcome {
    pub fn clean_success() -> Self {
        Self {
            success: true,
            has_conflicts: false,
            conflict_files: Vec::new(),
        }
    }

    pub fn conflict(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            success: false,
            has_conflicts: true,
            conflict_files: files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Version-control operations the dispatcher needs against the plan's
/// worktree and branch (§6).
#[async_trait]
pub trait Vcs: Send + Sync + 'static {
    /// Create `branch` off `base_branch`, suffixing on collision, and
    /// return the branch name actually created (§4.1 step 3).
    async fn create_branch(&self, base_branch: &str, desired_branch: &str) -> Result<String, VcsError>;

    /// Create a worktree for `branch` at `path`.
    async fn create_worktree(&self, branch: &str, path: &Path) -> Result<PathBuf, VcsError>;

    /// Stage and commit every pending change in the worktree with `message`.
    async fn commit_all(&self, worktree: &Path, message: &str) -> Result<String, VcsError>;

    /// Create an empty commit (used to seed a freshly-created branch before
    /// the first push, §4.1 step 3).
    async fn commit_empty(&self, worktree: &Path, message: &str) -> Result<String, VcsError>;

    async fn push(&self, worktree: &Path, branch: &str) -> Result<(), VcsError>;

    async fn force_push(&self, worktree: &Path, branch: &str) -> Result<(), VcsError>;

    /// Rebase `branch` onto `base_branch`, reporting conflicts rather than
    /// erroring on them (§4.3 "Triage step", §7 "Rebase conflict").
    async fn rebase_on_base(
        &self,
        worktree: &Path,
        branch: &str,
        base_branch: &str,
    ) -> Result<RebaseOutcome, VcsError>;

    /// Resolve a human-facing URL for the CR associated with `branch`, if
    /// the underlying remote/provider can produce one.
    async fn resolve_cr_url(&self, branch: &str) -> Result<Option<String>, VcsError>;
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
