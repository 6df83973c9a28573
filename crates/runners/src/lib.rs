// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker/Triage/Review runners (§4.3): thin wrappers over
//! [`prloom_core::AgentAdapter::execute`] that render prompts, await
//! completion via a pluggable [`CompletionWatcher`](poll::CompletionWatcher),
//! parse the result files an agent leaves behind in its scratch directory,
//! and hand the dispatcher a typed outcome to act on. No subprocess spawning
//! lives in this crate beyond the watcher's own liveness probes — the
//! adapter itself is vendor-specific and stays out of scope (§1).

pub mod launch;
pub mod paths;
pub mod poll;
pub mod prompt;
pub mod results;
pub mod review;
pub mod triage;
pub mod worker;

pub use launch::{run_agent_to_completion, run_agent_to_completion_default, AgentOutcome};
pub use paths::{
    commit_review_result_path, review_result_path, triage_result_path, worktree_scratch_dir,
    ScratchPaths,
};
pub use poll::{CompletionWatcher, ProcessWatcher, DEFAULT_POLL_PERIOD};
pub use prompt::{
    render_commit_review_prompt, render_review_prompt, render_triage_prompt, render_worker_prompt,
};
pub use results::{
    read_result_file, CommitReviewResultFile, ReviewResultComment, ReviewResultFile, ReviewVerdict,
    TriageOutcome, TriageResultFile,
};
pub use review::{ReviewRunner, ReviewStepOutcome};
pub use triage::{TriageRunner, TriageStepOutcome};
pub use worker::{WorkerRunner, WorkerStepOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("agent adapter error: {0}")]
    Adapter(#[from] prloom_core::interfaces::AgentAdapterError),

    #[error("vcs error: {0}")]
    Vcs(#[from] prloom_core::interfaces::VcsError),

    #[error("review provider error: {0}")]
    ReviewProvider(#[from] prloom_core::interfaces::ReviewProviderError),

    #[error("plan doc error: {0}")]
    PlanDoc(#[from] prloom_core::interfaces::PlanDocError),

    #[error("timed out waiting for completion after {0:?}")]
    CompletionTimeout(std::time::Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("result file parse failure: {0}")]
    ResultInvalid(String),
}
