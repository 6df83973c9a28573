// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The triage step (§4.3): renders the triage prompt from the plan plus new
//! feedback, launches the adapter, and interprets
//! `triage-result.json` into a rebase / reply / plan-edit action.

use std::path::Path;
use std::time::Duration;

use prloom_core::interfaces::{AgentAdapter, AgentExecuteRequest, FeedbackBatch, PlanDoc, ReviewProvider, Vcs};
use prloom_core::PlanDocument;

use crate::launch::run_agent_to_completion_default;
use crate::paths::{triage_result_path, ScratchPaths};
use crate::poll::CompletionWatcher;
use crate::prompt::render_triage_prompt;
use crate::results::{read_result_file, TriageOutcome, TriageResultFile};
use crate::RunnerError;

pub struct TriageRunner<'a> {
    pub adapter: &'a dyn AgentAdapter,
    pub watcher: &'a dyn CompletionWatcher,
    pub vcs: &'a dyn Vcs,
    pub plan_doc: &'a dyn PlanDoc,
    pub review_provider: &'a dyn ReviewProvider,
    pub agent_timeout: Duration,
}

/// Everything the caller needs out of one triage invocation (§4.3). On
/// `RebaseConflict`, the dispatcher is expected to block the plan and post
/// `conflict_comment_body` verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageStepOutcome {
    pub action: TriageOutcome,
    pub conflict_comment_body: Option<String>,
}

impl<'a> TriageRunner<'a> {
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        plan_id: &str,
        plan_path: &Path,
        worktree: &Path,
        branch: &str,
        base_branch: &str,
        cr: &str,
        feedback: &FeedbackBatch,
        stage_agent_model: Option<&str>,
        scratch_root: &Path,
    ) -> Result<TriageStepOutcome, RunnerError> {
        let plan: PlanDocument = self.plan_doc.parse(plan_path).await?;
        let prompt = render_triage_prompt(&plan, feedback);
        let scratch = ScratchPaths::new(scratch_root, plan_id);

        let request = AgentExecuteRequest {
            cwd: worktree.to_path_buf(),
            prompt,
            model: stage_agent_model.map(str::to_string),
            tmux: true,
            stage: "triage".to_string(),
        };
        run_agent_to_completion_default(
            self.adapter,
            self.watcher,
            request,
            &scratch.exitcode("triage"),
            self.agent_timeout,
        )
        .await?;

        let result: TriageResultFile = read_result_file(&triage_result_path(worktree))?;

        if result.rebase {
            let outcome = self.vcs.rebase_on_base(worktree, branch, base_branch).await?;
            if outcome.has_conflicts {
                let body = conflict_comment(plan_id, &outcome.conflict_files);
                self.review_provider.post_comment(cr, &body).await?;
                return Ok(TriageStepOutcome {
                    action: TriageOutcome::RebaseConflict { conflict_files: outcome.conflict_files },
                    conflict_comment_body: Some(body),
                });
            }
            self.vcs.force_push(worktree, branch).await?;
            if let Some(reply) = &result.reply_markdown {
                self.review_provider.post_comment(cr, reply).await?;
            }
            return Ok(TriageStepOutcome { action: TriageOutcome::RebaseClean, conflict_comment_body: None });
        }

        if let Some(reply) = &result.reply_markdown {
            self.review_provider.post_comment(cr, reply).await?;
            if !result.plan_edited {
                return Ok(TriageStepOutcome { action: TriageOutcome::RepliedOnly, conflict_comment_body: None });
            }
        }

        if result.plan_edited {
            let message = format!("[prloom] {plan_id}: triage");
            self.vcs.commit_all(worktree, &message).await?;
            self.vcs.push(worktree, branch).await?;
            return Ok(TriageStepOutcome { action: TriageOutcome::PlanEditsCommitted, conflict_comment_body: None });
        }

        Ok(TriageStepOutcome { action: TriageOutcome::NoAction, conflict_comment_body: None })
    }
}

fn conflict_comment(plan_id: &str, conflict_files: &[String]) -> String {
    format!(
        "Rebase conflict on plan `{plan_id}` in:\n\n{}\n\n\
         Resolve locally, then run `git rebase --continue` and push; \
         unblock the plan with `unpause {plan_id}` once the branch is clean.",
        conflict_files.iter().map(|f| format!("- `{f}`")).collect::<Vec<_>>().join("\n")
    )
}

#[cfg(test)]
#[path = "triage_tests.rs"]
mod tests;
