// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-plan advancement (§4.1, §4.2, §4.3, §4.6): the single tick applied
//! to one active plan. Skips drafts/queued plans, deletes plans whose CR
//! has merged or closed, runs the pending review step, polls feedback and
//! triages it, drives the worker loop with retry bookkeeping, gates CR
//! finalization behind a `beforeFinish` hook pass, and dispatches fresh
//! bus events through `onEvent` hooks.
//!
//! Feedback polling, the worker loop, and the finishing sequence only run
//! while `status == active`; `legal_transition` has no path out of
//! `review`/`paused` via triage, so driving those steps from any other
//! status would either be a no-op or an illegal transition.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prloom_bus::BusManager;
use prloom_core::interfaces::{
    AgentAdapter, AgentExecuteRequest, CrState, FeedbackBatch, PlanDoc, ReviewComment,
    ReviewProvider, Vcs,
};
use prloom_core::state_machine::{advance_todo_retry, decide_feedback_poll, TodoRetryOutcome};
use prloom_core::{Config, Event, FeedbackCursors, PlanId, PlanState, PlanStatus};
use prloom_hooks::{EventDecision, HookAgentRunner, HookChain, HookPoint, HookRegistry, PluginContext, RunAgentOptions};
use prloom_runners::{
    run_agent_to_completion_default, CompletionWatcher, ReviewRunner, ScratchPaths, TriageOutcome,
    TriageRunner, WorkerRunner, WorkerStepOutcome,
};

use crate::layout::RepoLayout;
use crate::DispatcherError;

const RETRY_LOG_TAIL_LINES: usize = 30;

/// What the caller should do with the plan after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Keep the entry; nothing further to do this tick.
    Continue,
    /// The CR has merged or closed; remove the entry from
    /// [`crate::state_store::DispatcherState`].
    Delete,
}

/// Everything [`advance_one`] needs besides the layout and the plan's own
/// state. Collaborators are handed over as `Arc`s (mirroring
/// [`crate::ingest::IngestDeps`]) so the hook runtime's `runAgent` seam,
/// which needs an owned, `'static` handle, can clone out of them.
pub struct AdvanceDeps<'a> {
    pub layout: &'a RepoLayout,
    pub vcs: &'a Arc<dyn Vcs>,
    pub review_provider: &'a Arc<dyn ReviewProvider>,
    pub plan_doc: &'a Arc<dyn PlanDoc>,
    pub adapter: &'a Arc<dyn AgentAdapter>,
    pub watcher: &'a Arc<dyn CompletionWatcher>,
    pub hooks: &'a HookRegistry,
    pub global_bus: &'a BusManager,
    pub config: &'a Config,
    pub agent_timeout: Duration,
    pub scratch_root: &'a Path,
}

/// Advance one plan by exactly one tick. Thin wrapper over
/// [`advance_one_inner`] that appends a best-effort entry to the
/// per-worktree fatal-error ledger (§7 `errors.jsonl`) the moment a plan
/// newly becomes blocked, the way the teacher's breadcrumb log records a
/// step failure alongside (not instead of) the structured state it
/// updates.
pub async fn advance_one(
    deps: &AdvanceDeps<'_>,
    id: &PlanId,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<AdvanceOutcome, DispatcherError> {
    let was_blocked = ps.blocked;
    let outcome = advance_one_inner(deps, id, ps, now_epoch_ms).await;
    if !was_blocked && ps.blocked {
        record_fatal_error(deps, id, ps, now_epoch_ms);
    }
    outcome
}

/// Best-effort append to `<worktree>/errors.jsonl` (§7). Failures to write
/// this ledger are themselves only logged, never propagated — it exists
/// for post-mortem, not for control flow.
fn record_fatal_error(deps: &AdvanceDeps<'_>, id: &PlanId, ps: &PlanState, now_epoch_ms: u64) {
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct FatalErrorEntry<'a> {
        plan_id: &'a str,
        ts_epoch_ms: u64,
        message: &'a str,
    }
    let message = ps.last_error.as_deref().unwrap_or("blocked with no recorded error");
    let entry = FatalErrorEntry { plan_id: id.as_str(), ts_epoch_ms: now_epoch_ms, message };
    match serde_json::to_vec(&entry) {
        Ok(line) => {
            if let Err(e) = prloom_bus::io::append_line(&deps.layout.worktree_errors_log(id), &line) {
                tracing::warn!(plan_id = %id, error = %e, "failed to append fatal-error ledger entry");
            }
        }
        Err(e) => tracing::warn!(plan_id = %id, error = %e, "failed to serialize fatal-error ledger entry"),
    }
}

async fn advance_one_inner(
    deps: &AdvanceDeps<'_>,
    id: &PlanId,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<AdvanceOutcome, DispatcherError> {
    // 1. Draft/queued plans have no worktree yet; ingestion handles them.
    if matches!(ps.status, PlanStatus::Draft | PlanStatus::Queued) {
        return Ok(AdvanceOutcome::Continue);
    }

    // 2. A plan whose worktree or plan file has vanished out from under the
    // dispatcher is logged and skipped rather than blocked — there is
    // nothing sensible to write `lastError` about yet.
    let Some(worktree) = ps.worktree_path.clone() else {
        tracing::warn!(plan_id = %id, "active plan has no worktree path recorded; skipping");
        return Ok(AdvanceOutcome::Continue);
    };
    if !worktree.exists() {
        tracing::warn!(plan_id = %id, worktree = %worktree.display(), "plan worktree is missing; skipping");
        return Ok(AdvanceOutcome::Continue);
    }
    let plan_path = deps.layout.worktree_plan_md(id);
    if !plan_path.exists() {
        tracing::warn!(plan_id = %id, plan_path = %plan_path.display(), "plan file is missing; skipping");
        return Ok(AdvanceOutcome::Continue);
    }
    let Some(cr) = ps.cr_reference.clone() else {
        tracing::warn!(plan_id = %id, "active plan has no CR reference recorded; skipping");
        return Ok(AdvanceOutcome::Continue);
    };

    // 3. A merged/closed CR means the plan is done; the caller deletes it.
    match deps.review_provider.get_cr_state(&cr).await? {
        CrState::Merged | CrState::Closed => return Ok(AdvanceOutcome::Delete),
        _ => {}
    }

    // 4. Blocked, mid-triage, mid-review, or manually paused plans sit idle
    // until a control command or the provider's CR state changes.
    if ps.blocked || matches!(ps.status, PlanStatus::Triaging | PlanStatus::Reviewing | PlanStatus::Paused) {
        return Ok(AdvanceOutcome::Continue);
    }

    // 5. A pending `review` command consumes itself and runs the review
    // step, independent of the plan's regular feedback-poll schedule.
    if ps.pending_review && ps.status == PlanStatus::Review {
        ps.pending_review = false;
        run_review_step(deps, id.as_str(), &plan_path, &worktree, &cr, ps, now_epoch_ms).await?;
        return Ok(AdvanceOutcome::Continue);
    }

    if ps.status != PlanStatus::Active {
        return Ok(AdvanceOutcome::Continue);
    }

    let branch = ps.branch.clone().unwrap_or_default();
    let base_branch = ps.base_branch.clone().unwrap_or_else(|| deps.config.base_branch.clone());

    // 6/7. Feedback poll + triage.
    let decision = decide_feedback_poll(now_epoch_ms, deps.config.github_poll_interval_ms, ps.last_polled_at_epoch_ms, ps.poll_once);
    if decision.should_poll {
        let batch = deps.review_provider.fetch_feedback(&cr).await?;
        let bot_login = deps.review_provider.bot_login().await?;
        let filtered = filter_new_feedback(&batch, &ps.feedback_cursors, &bot_login);

        ps.feedback_cursors.advance(FeedbackCursors {
            comments: batch.max_comment_id(),
            reviews: batch.max_review_id(),
            inline_comments: batch.max_inline_comment_id(),
        });
        if decision.clear_poll_once {
            ps.poll_once = false;
        }
        if decision.should_update_last_polled_at {
            ps.last_polled_at_epoch_ms = Some(now_epoch_ms);
        }

        if !filtered.is_empty() {
            run_triage(deps, id, &plan_path, &worktree, &branch, &base_branch, &cr, &filtered, ps, now_epoch_ms).await?;
            if ps.blocked {
                return Ok(AdvanceOutcome::Continue);
            }
        }
    }

    // 8. Worker step, gated by retry bookkeeping computed against the
    // *previous* tick's stored (lastTodoIndex, todoRetryCount).
    let plan_bus = BusManager::open(deps.layout.worktree_bus_root(id))?;
    let next_todo = deps.plan_doc.find_next_unchecked(&plan_path).await?;

    let settled = match next_todo {
        None => true,
        Some(todo_index) => {
            let (outcome, stored_index, stored_count) = advance_todo_retry(ps.last_todo_index, ps.todo_retry_count, todo_index);
            ps.last_todo_index = Some(stored_index);
            ps.todo_retry_count = stored_count;

            if matches!(outcome, TodoRetryOutcome::Reset) {
                ps.commit_review = None;
            }

            if matches!(outcome, TodoRetryOutcome::Exhausted) {
                let scratch = ScratchPaths::new(deps.scratch_root, id.as_str());
                let tail = tail_lines(&scratch.log("worker"), RETRY_LOG_TAIL_LINES);
                ps.blocked = true;
                ps.last_error = Some(format!("TODO #{todo_index} failed after 3 retries; last worker output:\n{tail}"));
                return Ok(AdvanceOutcome::Continue);
            }

            if let Err(e) = run_hook_point(deps, &plan_bus, id.as_str(), &worktree, HookPoint::BeforeTodo, String::new(), now_epoch_ms).await {
                ps.blocked = true;
                ps.last_error = Some(format!("Hook error: {e}"));
                return Ok(AdvanceOutcome::Continue);
            }

            let agent_name = ps.agent_override.as_deref().unwrap_or(&deps.config.agents.default);
            let mut attempt = ps.commit_review.take().unwrap_or_default();
            let worker_runner = WorkerRunner {
                adapter: deps.adapter.as_ref(),
                watcher: deps.watcher.as_ref(),
                vcs: deps.vcs.as_ref(),
                plan_doc: deps.plan_doc.as_ref(),
                agent_timeout: deps.agent_timeout,
            };
            let outcome = worker_runner
                .run(
                    id.as_str(),
                    &plan_path,
                    &worktree,
                    Some(&branch),
                    todo_index,
                    Some(deps.config.resolve_agent(agent_name, "worker")),
                    deps.scratch_root,
                    deps.config.commit_review.enabled,
                    deps.config.commit_review.max_loops,
                    deps.config.commit_review.agent.as_deref().map(|a| deps.config.resolve_agent(a, "commitReview")),
                    &mut attempt,
                    deps.config.commit_review.require_manual_resume,
                )
                .await?;
            ps.commit_review = Some(attempt);

            match outcome {
                WorkerStepOutcome::TodoBlocked { index, text } => {
                    ps.blocked = true;
                    ps.last_error = Some(format!("Blocked by TODO #{index}: {text}"));
                    false
                }
                WorkerStepOutcome::TodoNotCompleted { log_tail } => {
                    ps.last_error = Some(log_tail);
                    false
                }
                WorkerStepOutcome::CommitReviewExhausted { loop_count } => {
                    ps.blocked = true;
                    ps.last_error = Some(format!("commit-review gate rejected {loop_count} times (max reached)"));
                    false
                }
                WorkerStepOutcome::PausedForManualResume => {
                    ps.last_error = None;
                    ps.transition_to(PlanStatus::Paused, now_epoch_ms, Some("paused for manual resume after commit review".to_string()));
                    false
                }
                WorkerStepOutcome::TodoCompletedMoreRemain => {
                    ps.last_error = None;
                    ps.last_todo_index = None;
                    ps.todo_retry_count = 0;
                    ps.commit_review = None;
                    if let Err(e) = update_cr_body_now(deps, &plan_path, &cr).await {
                        ps.blocked = true;
                        ps.last_error = Some(e.to_string());
                        return Ok(AdvanceOutcome::Continue);
                    }
                    if let Err(e) = run_hook_point(deps, &plan_bus, id.as_str(), &worktree, HookPoint::AfterTodo, String::new(), now_epoch_ms).await {
                        ps.blocked = true;
                        ps.last_error = Some(format!("Hook error: {e}"));
                    }
                    false
                }
                WorkerStepOutcome::AllTodosSettled => {
                    ps.last_error = None;
                    ps.last_todo_index = None;
                    ps.todo_retry_count = 0;
                    ps.commit_review = None;
                    if let Err(e) = run_hook_point(deps, &plan_bus, id.as_str(), &worktree, HookPoint::AfterTodo, String::new(), now_epoch_ms).await {
                        ps.blocked = true;
                        ps.last_error = Some(format!("Hook error: {e}"));
                        false
                    } else {
                        true
                    }
                }
            }
        }
    };

    if ps.blocked {
        return Ok(AdvanceOutcome::Continue);
    }

    if settled {
        finalize_if_settled(deps, &plan_bus, id.as_str(), &plan_path, &worktree, &cr, ps, now_epoch_ms).await?;
        if ps.blocked {
            return Ok(AdvanceOutcome::Continue);
        }
    }

    // 9. onEvent: every fresh event on the plan's own bus gets one pass
    // through the registered onEvent hooks before it would otherwise reach
    // triage.
    let mut plan_bus = plan_bus;
    process_plan_events(deps, &mut plan_bus, id, &plan_path, &worktree, &branch, &base_branch, &cr, ps, now_epoch_ms).await?;

    Ok(AdvanceOutcome::Continue)
}

async fn run_review_step(
    deps: &AdvanceDeps<'_>,
    plan_id: &str,
    plan_path: &Path,
    worktree: &Path,
    cr: &str,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<(), DispatcherError> {
    ps.transition_to(PlanStatus::Reviewing, now_epoch_ms, None);

    let plan = deps.plan_doc.parse(plan_path).await?;
    // `Vcs` exposes no diff-retrieval operation; the plan body is the best
    // stand-in the reviewer prompt can be rendered against.
    let diff = deps.plan_doc.extract_body(&plan);
    let agent_name = ps.agent_override.as_deref().unwrap_or(&deps.config.agents.default);
    let stage_agent = deps.config.resolve_agent(agent_name, "review");

    let review_runner = ReviewRunner {
        adapter: deps.adapter.as_ref(),
        watcher: deps.watcher.as_ref(),
        review_provider: deps.review_provider.as_ref(),
        agent_timeout: deps.agent_timeout,
    };

    match review_runner.run(plan_id, &plan, worktree, cr, &diff, Some(stage_agent), deps.scratch_root).await {
        Ok(_) => {
            ps.poll_once = true;
            ps.last_error = None;
            ps.transition_to(PlanStatus::Active, now_epoch_ms, None);
        }
        Err(e) => {
            ps.blocked = true;
            ps.last_error = Some(format!("Review failed: {e}"));
            ps.transition_to(PlanStatus::Active, now_epoch_ms, Some(e.to_string()));
        }
    }
    Ok(())
}

/// Runs one triage pass against `feedback` and folds the outcome into
/// `ps` (§4.3). Shared by the regular feedback-poll path and by
/// [`process_plan_events`], which triages bus events that no `onEvent`
/// hook claimed.
#[allow(clippy::too_many_arguments)]
async fn run_triage(
    deps: &AdvanceDeps<'_>,
    id: &PlanId,
    plan_path: &Path,
    worktree: &Path,
    branch: &str,
    base_branch: &str,
    cr: &str,
    feedback: &FeedbackBatch,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<(), DispatcherError> {
    ps.transition_to(PlanStatus::Triaging, now_epoch_ms, None);
    let agent_name = ps.agent_override.as_deref().unwrap_or(&deps.config.agents.default);
    let stage_agent = deps.config.resolve_agent(agent_name, "triage");
    let triage_runner = TriageRunner {
        adapter: deps.adapter.as_ref(),
        watcher: deps.watcher.as_ref(),
        vcs: deps.vcs.as_ref(),
        plan_doc: deps.plan_doc.as_ref(),
        review_provider: deps.review_provider.as_ref(),
        agent_timeout: deps.agent_timeout,
    };
    match triage_runner.run(id.as_str(), plan_path, worktree, branch, base_branch, cr, feedback, Some(stage_agent), deps.scratch_root).await {
        Ok(outcome) => {
            match outcome.action {
                TriageOutcome::RebaseConflict { .. } => {
                    ps.blocked = true;
                    ps.last_error = Some(format!("Rebase conflict: {}", outcome.conflict_comment_body.unwrap_or_default()));
                }
                _ => ps.last_error = None,
            }
            ps.transition_to(PlanStatus::Active, now_epoch_ms, None);
        }
        Err(e) => {
            let _ = deps.review_provider.post_comment(cr, "Automated triage hit an error; attention needed.").await;
            ps.blocked = true;
            ps.last_error = Some(format!("attention needed: {e}"));
            ps.transition_to(PlanStatus::Active, now_epoch_ms, Some(e.to_string()));
        }
    }
    Ok(())
}

/// Turns a batch of bus events into a [`FeedbackBatch`] so they can run
/// through the same triage step as review feedback (§4.6: events the
/// `onEvent` hooks don't claim implicitly reach triage). The synthetic ids
/// are local to this call and never compared against `feedbackCursors`.
fn events_to_feedback(events: &[Event]) -> FeedbackBatch {
    let comments = events
        .iter()
        .enumerate()
        .map(|(i, e)| ReviewComment { id: i as u64 + 1, author: e.source.clone(), body: format!("[{}] {}\n\n{}", e.kind, e.title, e.body) })
        .collect();
    FeedbackBatch { comments, reviews: Vec::new(), inline_comments: Vec::new() }
}

/// Runs the `beforeFinish` gate; if no new TODOs were appended, updates and
/// marks the CR ready and transitions to `review`, then runs `afterFinish`.
async fn finalize_if_settled(
    deps: &AdvanceDeps<'_>,
    plan_bus: &BusManager,
    plan_id: &str,
    plan_path: &Path,
    worktree: &Path,
    cr: &str,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<(), DispatcherError> {
    let visits = ps.record_step_visit(HookPoint::BeforeFinish.as_str());
    if let Some(max) = deps.config.loop_guard.max_hook_visits {
        if visits > max {
            tracing::warn!(plan_id, visits, max, "beforeFinish loop guard tripped; finishing without another hook pass");
            return finish_cr(deps, cr, plan_path, ps, now_epoch_ms).await;
        }
    }

    let plan = deps.plan_doc.parse(plan_path).await?;
    let before_body = deps.plan_doc.extract_body(&plan);
    match run_hook_point(deps, plan_bus, plan_id, worktree, HookPoint::BeforeFinish, before_body.clone(), now_epoch_ms).await {
        Ok(after_body) => {
            let appended = hook_appended_todos(&before_body, &after_body);
            if !appended.is_empty() {
                deps.plan_doc.add_todos(plan_path, &appended).await?;
                ps.last_error = None;
                return Ok(());
            }
        }
        Err(e) => {
            ps.blocked = true;
            ps.last_error = Some(format!("Hook error: {e}"));
            return Ok(());
        }
    }

    finish_cr(deps, cr, plan_path, ps, now_epoch_ms).await?;

    let plan = deps.plan_doc.parse(plan_path).await?;
    let body = deps.plan_doc.extract_body(&plan);
    if let Err(e) = run_hook_point(deps, plan_bus, plan_id, worktree, HookPoint::AfterFinish, body, now_epoch_ms).await {
        ps.blocked = true;
        ps.last_error = Some(format!("Hook error: {e}"));
    }
    Ok(())
}

/// Re-parses the plan and pushes its body to the CR. Called after every
/// settled TODO (§4.3 worker step: "Re-parse. Update the CR body."), not
/// just at final settlement — `finish_cr` additionally marks the CR ready
/// once no unchecked TODOs remain.
async fn update_cr_body_now(deps: &AdvanceDeps<'_>, plan_path: &Path, cr: &str) -> Result<(), DispatcherError> {
    let plan = deps.plan_doc.parse(plan_path).await?;
    let body = deps.plan_doc.extract_body(&plan);
    deps.review_provider.update_cr_body(cr, &body).await?;
    Ok(())
}

async fn finish_cr(
    deps: &AdvanceDeps<'_>,
    cr: &str,
    plan_path: &Path,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<(), DispatcherError> {
    let plan = deps.plan_doc.parse(plan_path).await?;
    let body = deps.plan_doc.extract_body(&plan);
    deps.review_provider.update_cr_body(cr, &body).await?;
    deps.review_provider.mark_cr_ready(cr).await?;
    ps.transition_to(PlanStatus::Review, now_epoch_ms, None);
    ps.last_error = None;
    Ok(())
}

/// Runs every hook registered at `point`, flushes any actions a hook
/// emitted to the global bus, and returns the (possibly rewritten)
/// markdown. A failing hook aborts the chain; the caller turns that into
/// `PlanState::blocked` with `"Hook error: ..."` detail.
async fn run_hook_point(
    deps: &AdvanceDeps<'_>,
    plan_bus: &BusManager,
    plan_id: &str,
    worktree: &Path,
    point: HookPoint,
    markdown: String,
    now_epoch_ms: u64,
) -> Result<String, DispatcherError> {
    let runner: Arc<dyn HookAgentRunner> = Arc::new(PlanHookAgentRunner {
        adapter: deps.adapter.clone(),
        watcher: deps.watcher.clone(),
        worktree: worktree.to_path_buf(),
        scratch_root: deps.scratch_root.to_path_buf(),
        plan_id: plan_id.to_string(),
        agent_timeout: deps.agent_timeout,
    });
    let mut ctx = PluginContext::new("dispatcher-hooks", point, plan_bus, deps.global_bus, Some(runner), now_epoch_ms);

    let result = HookChain::run(deps.hooks, point, markdown, &mut ctx).await;
    for action in ctx.take_pending_actions() {
        deps.global_bus.emit_action(now_epoch_ms, &action)?;
    }
    Ok(result?)
}

/// `onEvent`: every event freshly observed on the plan's own bus gets one
/// pass through the registered hooks. A hook that calls
/// `markEventHandled` drops the event before triage; one that calls
/// `markEventDeferred` parks it (body and all) until its backoff elapses;
/// anything else — an explicit no-op or no `onEvent` hook at all — is the
/// §4.6 default of "pass through to triage unchanged", so it's folded into
/// the same triage step fresh feedback would go through. Events whose
/// deferral has already elapsed skip the hook pass and go straight to
/// triage, the way a backoff's re-offer is supposed to work.
#[allow(clippy::too_many_arguments)]
async fn process_plan_events(
    deps: &AdvanceDeps<'_>,
    plan_bus: &mut BusManager,
    id: &PlanId,
    plan_path: &Path,
    worktree: &Path,
    branch: &str,
    base_branch: &str,
    cr: &str,
    ps: &mut PlanState,
    now_epoch_ms: u64,
) -> Result<(), DispatcherError> {
    let plan_id = id.as_str();
    let fresh = plan_bus.poll_new_events()?;
    let mut to_triage: Vec<Event> = plan_bus.take_ready_deferred_events(now_epoch_ms);

    for event in fresh {
        let runner: Arc<dyn HookAgentRunner> = Arc::new(PlanHookAgentRunner {
            adapter: deps.adapter.clone(),
            watcher: deps.watcher.clone(),
            worktree: worktree.to_path_buf(),
            scratch_root: deps.scratch_root.to_path_buf(),
            plan_id: plan_id.to_string(),
            agent_timeout: deps.agent_timeout,
        });
        let mut ctx = PluginContext::new("dispatcher-hooks", HookPoint::OnEvent, &*plan_bus, deps.global_bus, Some(runner), now_epoch_ms)
            .with_current_event(event.clone());

        let result = HookChain::run(deps.hooks, HookPoint::OnEvent, String::new(), &mut ctx).await;
        for action in ctx.take_pending_actions() {
            deps.global_bus.emit_action(now_epoch_ms, &action)?;
        }
        if let Err(e) = result {
            ps.blocked = true;
            ps.last_error = Some(format!("Hook error: {e}"));
            plan_bus.persist()?;
            return Ok(());
        }

        match ctx.take_event_decision() {
            Some(EventDecision::Handled) => {}
            Some(EventDecision::Deferred { reason, retry_after_ms }) => {
                plan_bus.defer_event(event, reason, now_epoch_ms + retry_after_ms);
            }
            None => to_triage.push(event),
        }
    }

    if !to_triage.is_empty() {
        if !ps.blocked && ps.status == PlanStatus::Active {
            let feedback = events_to_feedback(&to_triage);
            run_triage(deps, id, plan_path, worktree, branch, base_branch, cr, &feedback, ps, now_epoch_ms).await?;
        } else {
            // A hook or the worker step settled the plan into a non-active
            // status (or blocked it) earlier this same tick — triage only
            // runs for `active` plans (§4.3), so park these for an
            // immediate re-offer next tick rather than triaging into an
            // illegal status transition.
            for event in to_triage {
                plan_bus.defer_event(event, "plan not active this tick".to_string(), now_epoch_ms);
            }
        }
    }

    plan_bus.persist()?;
    Ok(())
}

/// The glue between the hook runtime's abstract `runAgent` and the runner
/// crate's subprocess launch-and-wait sequence. Owns everything it needs so
/// it can be wrapped in an `Arc<dyn HookAgentRunner>` (which requires
/// `'static`) without borrowing from the tick's `AdvanceDeps`.
struct PlanHookAgentRunner {
    adapter: Arc<dyn AgentAdapter>,
    watcher: Arc<dyn CompletionWatcher>,
    worktree: PathBuf,
    scratch_root: PathBuf,
    plan_id: String,
    agent_timeout: Duration,
}

#[async_trait]
impl HookAgentRunner for PlanHookAgentRunner {
    async fn run_agent(&self, prompt: &str, options: RunAgentOptions) -> Result<String, prloom_hooks::HookError> {
        let scratch = ScratchPaths::new(&self.scratch_root, &self.plan_id);
        let request = AgentExecuteRequest {
            cwd: self.worktree.clone(),
            prompt: prompt.to_string(),
            model: options.model,
            tmux: true,
            stage: options.stage.unwrap_or_else(|| "hook".to_string()),
        };
        run_agent_to_completion_default(self.adapter.as_ref(), self.watcher.as_ref(), request, &scratch.exitcode("hook"), self.agent_timeout)
            .await
            .map_err(|e| prloom_hooks::HookError::AgentRunFailed(e.to_string()))?;
        Ok(std::fs::read_to_string(scratch.log("hook")).unwrap_or_default())
    }
}

fn filter_new_feedback(batch: &FeedbackBatch, cursors: &FeedbackCursors, bot_login: &str) -> FeedbackBatch {
    let keep = |c: &&ReviewComment, cursor: u64| c.id > cursor && c.author != bot_login;
    FeedbackBatch {
        comments: batch.comments.iter().filter(|c| keep(c, cursors.comments)).cloned().collect(),
        reviews: batch.reviews.iter().filter(|r| keep(r, cursors.reviews)).cloned().collect(),
        inline_comments: batch
            .inline_comments
            .iter()
            .filter(|c| c.id > cursors.inline_comments && c.author != bot_login)
            .cloned()
            .collect(),
    }
}

/// Diffs a hook's returned markdown against what it was given and treats
/// every non-blank appended line as a new TODO's text (stripping an
/// optional `- [ ]`/`[ ]`/`-` checkbox prefix). This is a deliberately
/// narrow stand-in for parsing a hook's rewritten markdown back into
/// structured TODOs — there is no markdown parser in this workspace (see
/// DESIGN.md).
fn hook_appended_todos(before: &str, after: &str) -> Vec<String> {
    let Some(appended) = after.strip_prefix(before) else {
        return Vec::new();
    };
    appended
        .lines()
        .map(strip_checkbox_prefix)
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_checkbox_prefix(line: &str) -> String {
    let trimmed = line.trim();
    for prefix in ["- [ ]", "[ ]", "-"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    trimmed.to_string()
}

fn tail_lines(path: &Path, n: usize) -> String {
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
#[path = "advance_tests.rs"]
mod tests;
