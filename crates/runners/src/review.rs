// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The review step (§4.3): runs the reviewer sub-agent against the CR
//! diff and submits its verdict atomically via `ReviewProvider`.

use std::path::Path;
use std::time::Duration;

use prloom_core::interfaces::{
    AgentAdapter, AgentExecuteRequest, InlineReviewComment, ReviewProvider, ReviewSubmission,
};
use prloom_core::PlanDocument;

use crate::launch::run_agent_to_completion_default;
use crate::paths::{review_result_path, ScratchPaths};
use crate::poll::CompletionWatcher;
use crate::prompt::render_review_prompt;
use crate::results::{read_result_file, ReviewResultFile, ReviewVerdict};
use crate::RunnerError;

pub struct ReviewRunner<'a> {
    pub adapter: &'a dyn AgentAdapter,
    pub watcher: &'a dyn CompletionWatcher,
    pub review_provider: &'a dyn ReviewProvider,
    pub agent_timeout: Duration,
}

/// The review step always returns to `active` with `pollOnce = true` on
/// success (§4.3); the caller applies that state change, this type only
/// reports what was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewStepOutcome {
    pub verdict: ReviewVerdict,
    pub summary: String,
}

impl<'a> ReviewRunner<'a> {
    pub async fn run(
        &self,
        plan_id: &str,
        plan: &PlanDocument,
        worktree: &Path,
        cr: &str,
        diff: &str,
        stage_agent_model: Option<&str>,
        scratch_root: &Path,
    ) -> Result<ReviewStepOutcome, RunnerError> {
        let prompt = render_review_prompt(plan, diff);
        let scratch = ScratchPaths::new(scratch_root, plan_id);

        let request = AgentExecuteRequest {
            cwd: worktree.to_path_buf(),
            prompt,
            model: stage_agent_model.map(str::to_string),
            tmux: true,
            stage: "review".to_string(),
        };
        run_agent_to_completion_default(
            self.adapter,
            self.watcher,
            request,
            &scratch.exitcode("review"),
            self.agent_timeout,
        )
        .await?;

        let result: ReviewResultFile = read_result_file(&review_result_path(worktree))?;

        let verdict_str = match result.verdict {
            ReviewVerdict::Approve => "approve",
            ReviewVerdict::RequestChanges => "request_changes",
            ReviewVerdict::Comment => "comment",
        };
        let inline_comments = result
            .comments
            .iter()
            .enumerate()
            .map(|(i, c)| InlineReviewComment {
                id: i as u64,
                author: "prloom-bot".to_string(),
                file: c.file.clone(),
                line: c.line,
                body: c.body.clone(),
            })
            .collect();

        self.review_provider
            .submit_review(
                cr,
                ReviewSubmission {
                    verdict: verdict_str.to_string(),
                    summary: result.summary.clone(),
                    inline_comments,
                },
            )
            .await?;

        Ok(ReviewStepOutcome { verdict: result.verdict, summary: result.summary })
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
