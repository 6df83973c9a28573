// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`PlanState`]: the mutable, persisted record the dispatcher advances one
//! tick at a time. Everything here is serialized verbatim into `state.json`
//! (§6) except the transient runner handle, which never survives a restart.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::commit_review::CommitReviewAttempt;

/// Maximum number of times the worker retries the same TODO index before the
/// plan is blocked (§4.3 "Retry tracking").
pub const MAX_TODO_RETRIES: u32 = 3;

/// A plan's position in its lifecycle (§4.2).
///
/// `Draft` and `Queued` are pre-worktree states (§3 invariant 3: a plan in
/// either of these has no worktree and no branch). There is no explicit
/// transition into `Done` in §4.2's table — in practice a merged/closed CR
/// causes the plan to be deleted from state outright (§4.1 step 3). `Done`
/// is set for the single tick in which the dispatcher observes the merge
/// before removing the entry, so that invariant 4 ("status==done implies CR
/// non-draft and all TODOs settled") is never observably violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Queued,
    Active,
    Triaging,
    Reviewing,
    Paused,
    Review,
    Done,
}

/// The transient handle to a detached runner subprocess (§4.3: "the adapter
/// returns either `{tmuxSession}` ... or `{pid}` ... or a synchronous
/// `{exitCode}`"). Never persisted: on restart there is no live process to
/// resume waiting on, so reconciliation re-evaluates the plan from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerHandle {
    Tmux { session: String },
    Pid { pid: u32 },
}

/// The three independent high-water marks the dispatcher advances after a
/// feedback poll (§4.1 step 7): top-level comments, reviews, and inline
/// review-comments. An id of `0` means "nothing seen yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCursors {
    pub comments: u64,
    pub reviews: u64,
    pub inline_comments: u64,
}

impl FeedbackCursors {
    /// Advance each cursor to `max(prev, seen)` — never regresses (§3
    /// invariant 7 applies to bus offsets, but the same never-regress
    /// discipline is worth preserving here).
    pub fn advance(&mut self, seen: FeedbackCursors) {
        self.comments = self.comments.max(seen.comments);
        self.reviews = self.reviews.max(seen.reviews);
        self.inline_comments = self.inline_comments.max(seen.inline_comments);
    }
}

/// One entry in the supplemented bounded history of status transitions a
/// plan has gone through. Not named in §3's entity table, but grounded on
/// the teacher's `StepRecord`/`StepStatus` pattern: a small ring of recent
/// transitions makes `lastError` debuggable without unbounded growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: PlanStatus,
    pub to: PlanStatus,
    pub at_epoch_ms: u64,
    pub reason: Option<String>,
}

/// Bound on [`PlanState::history`] — oldest entries are dropped first.
pub const MAX_STATUS_HISTORY: usize = 50;

/// The full mutable record the dispatcher loop advances for one plan, once
/// per tick (§3 entity table, §4.1, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    pub status: PlanStatus,

    /// Latch cleared only by the `unpause` command (§4.1 command table).
    pub blocked: bool,

    pub worktree_path: Option<PathBuf>,
    pub branch: Option<String>,
    pub base_branch: Option<String>,

    /// Opaque reference resolvable by a `ReviewProvider` implementation
    /// (PR/MR number, URL, whatever the provider needs).
    pub cr_reference: Option<String>,

    /// Overrides `agents.default` / per-stage config for this plan only.
    pub agent_override: Option<String>,

    pub last_polled_at_epoch_ms: Option<u64>,
    pub feedback_cursors: FeedbackCursors,

    pub last_todo_index: Option<usize>,
    pub todo_retry_count: u32,

    /// One-shot flag set by the `poll` command (§4.1): forces exactly one
    /// feedback poll on the next advance without disturbing the schedule.
    pub poll_once: bool,

    /// One-shot flag set by the `review` command when `status == review`;
    /// consumed (and cleared) by the next advance (§4.1 step 5).
    pub pending_review: bool,

    pub commit_review: Option<CommitReviewAttempt>,

    pub last_error: Option<String>,

    /// Supplemented: bounded transition history (see [`StatusTransition`]).
    #[serde(default)]
    pub history: Vec<StatusTransition>,

    /// Supplemented loop guard (§9 open question: `beforeFinish` looping has
    /// "no explicit termination contract"; here it's tracked per hook point
    /// name so a max-visit config can block a runaway plan instead of
    /// spinning forever). Keyed by hook point name.
    #[serde(default)]
    pub step_visits: HashMap<String, u32>,

    /// Transient: never serialized, never survives a restart.
    #[serde(skip)]
    pub runner: Option<RunnerHandle>,
}

impl PlanState {
    /// A freshly-ingested plan: `draft`, no worktree, no branch (§3
    /// invariant 3).
    pub fn new_draft() -> Self {
        Self {
            status: PlanStatus::Draft,
            blocked: false,
            worktree_path: None,
            branch: None,
            base_branch: None,
            cr_reference: None,
            agent_override: None,
            last_polled_at_epoch_ms: None,
            feedback_cursors: FeedbackCursors::default(),
            last_todo_index: None,
            todo_retry_count: 0,
            poll_once: false,
            pending_review: false,
            commit_review: None,
            last_error: None,
            history: Vec::new(),
            step_visits: HashMap::new(),
            runner: None,
        }
    }

    /// Record a transition, trimming the history to [`MAX_STATUS_HISTORY`].
    /// Does not validate legality — callers should check
    /// [`crate::state_machine::legal_transition`] first.
    pub fn transition_to(&mut self, to: PlanStatus, at_epoch_ms: u64, reason: Option<String>) {
        self.history.push(StatusTransition {
            from: self.status,
            to,
            at_epoch_ms,
            reason,
        });
        if self.history.len() > MAX_STATUS_HISTORY {
            let overflow = self.history.len() - MAX_STATUS_HISTORY;
            self.history.drain(0..overflow);
        }
        self.status = to;
    }

    /// Increment the visit counter for a named loop point, returning the new
    /// count. Used by the supplemented `beforeFinish` loop guard.
    pub fn record_step_visit(&mut self, point: &str) -> u32 {
        let count = self.step_visits.entry(point.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[cfg(test)]
#[path = "plan_state_tests.rs"]
mod tests;
