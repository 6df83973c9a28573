// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk repo layout (§6 "File layout"), rooted at the repository
//! this dispatcher instance manages. Every other module in this crate
//! resolves its paths through a [`RepoLayout`] rather than hardcoding
//! strings, so the layout only needs to be right in one place.

use std::path::{Path, PathBuf};

use prloom_core::PlanId;

#[derive(Debug, Clone)]
pub struct RepoLayout {
    repo_root: PathBuf,
    /// Overrides the default `worktrees_dir()` when `config.worktrees_dir`
    /// (§6) points somewhere other than `prloom/.local/worktrees` — e.g. a
    /// faster local disk than the repo checkout sits on.
    worktrees_dir_override: Option<PathBuf>,
}

impl RepoLayout {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { repo_root: repo_root.into(), worktrees_dir_override: None }
    }

    pub fn with_worktrees_dir(repo_root: impl Into<PathBuf>, worktrees_dir: impl Into<PathBuf>) -> Self {
        Self { repo_root: repo_root.into(), worktrees_dir_override: Some(worktrees_dir.into()) }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// `.prloom/` — IPC and locking, sibling to the tracked `prloom/` tree
    /// rather than inside it (§6).
    fn dot_prloom(&self) -> PathBuf {
        self.repo_root.join(".prloom")
    }

    pub fn control_log(&self) -> PathBuf {
        self.dot_prloom().join("control.jsonl")
    }

    pub fn repo_lock(&self) -> PathBuf {
        self.dot_prloom().join("repo.lock")
    }

    /// `prloom/` — the tracked, committed tree: resolved config plus the
    /// durable local store (§6).
    fn prloom(&self) -> PathBuf {
        self.repo_root.join("prloom")
    }

    pub fn config_json(&self) -> PathBuf {
        self.prloom().join("config.json")
    }

    fn local(&self) -> PathBuf {
        self.prloom().join(".local")
    }

    pub fn state_json(&self) -> PathBuf {
        self.local().join("state.json")
    }

    pub fn inbox_dir(&self) -> PathBuf {
        self.local().join("inbox")
    }

    pub fn inbox_plan_md(&self, id: &PlanId) -> PathBuf {
        self.inbox_dir().join(format!("{}.md", id.as_str()))
    }

    pub fn inbox_plan_meta(&self, id: &PlanId) -> PathBuf {
        self.inbox_dir().join(format!("{}.json", id.as_str()))
    }

    /// Maps a bridge source identity (§4.5 `findPlanBySource`) to the plan
    /// id it resolved to, across both inbox and active plans. Not named in
    /// §6's layout tree — PlanState has no room for a source identity, so
    /// this index is the dispatcher's own bookkeeping for the `prloom-core`
    /// bridge's uniqueness key.
    pub fn source_index_json(&self) -> PathBuf {
        self.local().join("sources.json")
    }

    /// The repo-global bus root (§4.4: "A parallel tree at
    /// `<repoRoot>/prloom/.local/bus/` holds the global bus").
    pub fn global_bus_root(&self) -> PathBuf {
        self.local().join("bus")
    }

    pub fn worktrees_dir(&self) -> PathBuf {
        self.worktrees_dir_override.clone().unwrap_or_else(|| self.local().join("worktrees"))
    }

    pub fn worktree_dir(&self, id: &PlanId) -> PathBuf {
        self.worktrees_dir().join(id.as_str())
    }

    fn worktree_local(&self, id: &PlanId) -> PathBuf {
        self.worktree_dir(id).join("prloom").join(".local")
    }

    pub fn worktree_plan_md(&self, id: &PlanId) -> PathBuf {
        self.worktree_local(id).join("plan.md")
    }

    /// The per-plan mirror of `PlanState`, written for observability —
    /// the authoritative copy lives in the repo-root `state.json` (§6).
    pub fn worktree_state_json(&self, id: &PlanId) -> PathBuf {
        self.worktree_local(id).join("state.json")
    }

    pub fn worktree_bus_root(&self, id: &PlanId) -> PathBuf {
        self.worktree_local(id).join("bus")
    }

    /// External scratch, outside the repository entirely (§5, §6):
    /// `/tmp/prloom-<planId>/`. Parameterized by `scratch_root` so tests
    /// can point it at a tempdir instead of `/tmp`.
    pub fn external_scratch_root(scratch_root: &Path) -> PathBuf {
        scratch_root.to_path_buf()
    }

    /// `<worktree>/errors.jsonl` (§7: "fatal" errors, written best-effort,
    /// per worktree).
    pub fn worktree_errors_log(&self, id: &PlanId) -> PathBuf {
        self.worktree_dir(id).join("errors.jsonl")
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
