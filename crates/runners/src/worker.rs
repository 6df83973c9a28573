// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker step (§4.3): executes the next unchecked TODO, commits and
//! pushes on success, runs the optional commit-review gate, and signals
//! when every TODO is settled. CR finalization happens one layer up, after
//! a `beforeFinish` hook has had a chance to append more TODOs.

use std::path::Path;
use std::time::Duration;

use prloom_core::interfaces::{AgentAdapter, AgentExecuteRequest, PlanDoc, Vcs};
use prloom_core::{CommitReviewAttempt, CommitReviewVerdict, PlanDocument};

use crate::launch::run_agent_to_completion_default;
use crate::paths::{commit_review_result_path, ScratchPaths};
use crate::poll::CompletionWatcher;
use crate::prompt::{render_commit_review_prompt, render_worker_prompt};
use crate::results::{read_result_file, CommitReviewResultFile};
use crate::RunnerError;

const WORKER_LOG_TAIL_LINES: usize = 30;

/// What the worker step decided, for the dispatcher to turn into a
/// `PlanState` update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStepOutcome {
    /// `t.blocked` was set; the plan must be blocked immediately, no agent
    /// was launched.
    TodoBlocked { index: usize, text: String },
    /// The agent ran but the TODO is still unchecked; this counts as a
    /// retry attempt (§4.3 "Completion check").
    TodoNotCompleted { log_tail: String },
    /// The TODO was completed and committed, but more TODOs remain.
    TodoCompletedMoreRemain,
    /// Every TODO is now done or blocked. Finalizing the CR is the caller's
    /// job, after giving a `beforeFinish` hook the chance to append more
    /// TODOs and keep the plan open.
    AllTodosSettled,
    /// The commit-review gate rejected the commit `loop_count` times and
    /// has now reached `max_loops`; the plan must be blocked.
    CommitReviewExhausted { loop_count: u32 },
    /// The commit-review gate passed (or is disabled) and
    /// `requireManualResume` is set; the plan must pause.
    PausedForManualResume,
}

pub struct WorkerRunner<'a> {
    pub adapter: &'a dyn AgentAdapter,
    pub watcher: &'a dyn CompletionWatcher,
    pub vcs: &'a dyn Vcs,
    pub plan_doc: &'a dyn PlanDoc,
    pub agent_timeout: Duration,
}

impl<'a> WorkerRunner<'a> {
    /// Run one worker step against the TODO at `todo_index` (the caller has
    /// already resolved "next unchecked" and done retry bookkeeping via
    /// [`prloom_core::advance_todo_retry`] before calling this).
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        plan_id: &str,
        plan_path: &Path,
        worktree: &Path,
        branch: Option<&str>,
        todo_index: usize,
        stage_agent_model: Option<&str>,
        scratch_root: &Path,
        commit_review_enabled: bool,
        commit_review_max_loops: u32,
        commit_review_agent_model: Option<&str>,
        commit_review_attempt: &mut CommitReviewAttempt,
        require_manual_resume: bool,
    ) -> Result<WorkerStepOutcome, RunnerError> {
        let plan: PlanDocument = self.plan_doc.parse(plan_path).await?;
        let Some(todo) = plan.todos.get(todo_index) else {
            return Ok(WorkerStepOutcome::AllTodosSettled);
        };
        if todo.blocked {
            return Ok(WorkerStepOutcome::TodoBlocked { index: todo.index, text: todo.text.clone() });
        }

        let prompt = render_worker_prompt(&plan, todo);
        let scratch = ScratchPaths::new(scratch_root, plan_id);

        let request = AgentExecuteRequest {
            cwd: worktree.to_path_buf(),
            prompt,
            model: stage_agent_model.map(str::to_string),
            tmux: true,
            stage: "worker".to_string(),
        };
        run_agent_to_completion_default(
            self.adapter,
            self.watcher,
            request,
            &scratch.exitcode("worker"),
            self.agent_timeout,
        )
        .await?;

        let reparsed = self.plan_doc.parse(plan_path).await?;
        let still_unchecked = reparsed.todos.get(todo_index).map(|t| !t.done).unwrap_or(true);
        if still_unchecked {
            let log_tail = tail_lines(&scratch.log("worker"), WORKER_LOG_TAIL_LINES);
            return Ok(WorkerStepOutcome::TodoNotCompleted { log_tail });
        }

        let commit_message = format!("[prloom] {plan_id}: {}", todo.text);
        self.vcs.commit_all(worktree, &commit_message).await?;
        if let Some(branch) = branch {
            self.vcs.push(worktree, branch).await?;
        }

        if commit_review_enabled {
            let diff = tail_lines(&scratch.log("worker"), WORKER_LOG_TAIL_LINES);
            let review_prompt = render_commit_review_prompt(todo, &diff);
            let result_path = commit_review_result_path(worktree);
            let request = AgentExecuteRequest {
                cwd: worktree.to_path_buf(),
                prompt: review_prompt,
                model: commit_review_agent_model.map(str::to_string),
                tmux: true,
                stage: "commitReview".to_string(),
            };
            run_agent_to_completion_default(
                self.adapter,
                self.watcher,
                request,
                &scratch.exitcode("commitReview"),
                self.agent_timeout,
            )
            .await?;
            let review: CommitReviewResultFile = read_result_file(&result_path)?;
            commit_review_attempt.record(review.verdict);
            if review.verdict == CommitReviewVerdict::Reject {
                self.plan_doc.set_todo_done(plan_path, todo_index, false).await?;
                if commit_review_attempt.exhausted(commit_review_max_loops) {
                    return Ok(WorkerStepOutcome::CommitReviewExhausted {
                        loop_count: commit_review_attempt.loop_count,
                    });
                }
                return Ok(WorkerStepOutcome::TodoNotCompleted {
                    log_tail: review.reason.unwrap_or_default(),
                });
            }
        }

        if require_manual_resume {
            return Ok(WorkerStepOutcome::PausedForManualResume);
        }

        let final_doc = self.plan_doc.parse(plan_path).await?;
        if final_doc.all_todos_settled() {
            Ok(WorkerStepOutcome::AllTodosSettled)
        } else {
            Ok(WorkerStepOutcome::TodoCompletedMoreRemain)
        }
    }
}

fn tail_lines(path: &Path, n: usize) -> String {
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
