// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy (§7). Every variant here is something the dispatcher
//! catches per-plan and turns into `PlanState::last_error` rather than
//! letting propagate past the tick boundary — see `prloom-dispatcher`'s
//! top-level loop.

use thiserror::Error;

use crate::interfaces::{AgentAdapterError, PlanDocError, ReviewProviderError, VcsError};

/// A plan-scoped failure, with enough structure for the dispatcher to
/// decide whether to block the plan and what to tell a human (§7).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    #[error("review provider error: {0}")]
    ReviewProvider(#[from] ReviewProviderError),

    #[error("agent adapter error: {0}")]
    AgentAdapter(#[from] AgentAdapterError),

    #[error("plan doc error: {0}")]
    PlanDoc(#[from] PlanDocError),

    #[error("TODO #{index} failed after {attempts} retries")]
    TodoExecutionFailed { index: usize, attempts: u32, log_tail: String },

    #[error("Hook error: {0}")]
    HookFailed(String),

    #[error("Rebase conflict: {0}")]
    RebaseConflict(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Triage result parse failure: {0}")]
    TriageResultInvalid(String),

    #[error("Review result parse failure: {0}")]
    ReviewResultInvalid(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether this error represents a "fatal" severity that should also be
    /// written to the per-worktree `errors.jsonl` for post-mortem (§7).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::TodoExecutionFailed { .. }
                | CoreError::HookFailed(_)
                | CoreError::RebaseConflict(_)
                | CoreError::InvalidPlan(_)
                | CoreError::TriageResultInvalid(_)
                | CoreError::ReviewResultInvalid(_)
        )
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
