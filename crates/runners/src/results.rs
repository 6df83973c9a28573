// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk shapes the triage/review/commit-review sub-agents write into
//! their worktree scratch dir, and the typed outcome the triage runner
//! derives from them (§4.3).

use serde::{Deserialize, Serialize};

use crate::RunnerError;

/// `triage-result.json` (§4.3 "Triage step"). Exactly one of `rebase`,
/// `reply_markdown`, or a plan edit (signalled by `plan_edited`) is
/// expected to be meaningful per invocation, but the shape does not forbid
/// an agent setting more than one — the runner applies them in the order
/// listed in §4.3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageResultFile {
    #[serde(default)]
    pub rebase: bool,
    #[serde(default)]
    pub reply_markdown: Option<String>,
    #[serde(default)]
    pub plan_edited: bool,
}

/// What the triage runner decided to do, for the dispatcher to log/act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageOutcome {
    RebaseClean,
    RebaseConflict { conflict_files: Vec<String> },
    RepliedOnly,
    PlanEditsCommitted,
    NoAction,
}

/// `review-result.json` (§4.3 "Review step").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResultFile {
    pub verdict: ReviewVerdict,
    pub summary: String,
    #[serde(default)]
    pub comments: Vec<ReviewResultComment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approve,
    RequestChanges,
    Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResultComment {
    pub file: String,
    #[serde(default)]
    pub line: Option<u32>,
    pub body: String,
}

/// `commit-review-result.json` (§4.3: commit-review gate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReviewResultFile {
    pub verdict: prloom_core::CommitReviewVerdict,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Read and parse a result file, mapping any failure to
/// [`RunnerError::ResultInvalid`] (§7: the dispatcher blocks the plan on a
/// malformed result rather than propagating a raw I/O or JSON error).
pub fn read_result_file<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T, RunnerError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::ResultInvalid(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| RunnerError::ResultInvalid(format!("{}: {e}", path.display())))
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
