// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use prloom_bus::BusManager;
use prloom_core::interfaces::{CrState, PlanDoc, ReviewProviderError};
use prloom_core::test_support::{FakeAgentAdapter, FakePlanDoc, FakeReviewProvider, FakeVcs};
use prloom_core::config::{AgentsConfig, BusConfig, CommitReviewConfig, LoopGuardConfig, ReviewConfig};
use prloom_core::{Config, PlanDocument, RunnerHandle, Todo};
use prloom_hooks::HookRegistry;
use prloom_runners::CompletionWatcher;
use tempfile::tempdir;

use super::*;

struct AlwaysFinished;

#[async_trait]
impl CompletionWatcher for AlwaysFinished {
    async fn is_finished(&self, _handle: &RunnerHandle, _exitcode_path: &Path) -> bool {
        true
    }
}

fn base_config() -> Config {
    Config {
        agents: AgentsConfig { default: "claude".to_string(), by_name: HashMap::new() },
        base_branch: "main".to_string(),
        worktrees_dir: PathBuf::from("/tmp/prloom-worktrees"),
        github_poll_interval_ms: 0,
        bus: BusConfig::default(),
        bridges: HashMap::new(),
        global_bridges: HashMap::new(),
        plugins: HashMap::new(),
        global_plugins: HashMap::new(),
        copy_files: Vec::new(),
        init_commands: Vec::new(),
        presets: HashMap::new(),
        review: ReviewConfig::default(),
        commit_review: CommitReviewConfig::default(),
        loop_guard: LoopGuardConfig::default(),
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    layout: RepoLayout,
    id: PlanId,
    worktree: PathBuf,
    vcs: Arc<dyn Vcs>,
    review_provider: Arc<FakeReviewProvider>,
    plan_doc: Arc<dyn PlanDoc>,
    adapter: Arc<dyn AgentAdapter>,
    watcher: Arc<dyn CompletionWatcher>,
    hooks: HookRegistry,
    config: Config,
}

/// An `AgentAdapter` stand-in for tests that need the worker step to
/// actually complete a TODO: `FakeAgentAdapter` only records calls, so
/// nothing ever marks a TODO done the way a real coding agent editing the
/// worktree would. On a `"worker"`-stage request this marks the plan's
/// first unchecked TODO done before returning, same as
/// `run_agent_to_completion` would observe a synchronous success.
struct CompletingAdapter {
    plan_doc: FakePlanDoc,
    plan_path: PathBuf,
}

#[async_trait]
impl AgentAdapter for CompletingAdapter {
    async fn execute(
        &self,
        request: prloom_core::interfaces::AgentExecuteRequest,
    ) -> Result<prloom_core::interfaces::AgentExecuteResult, prloom_core::interfaces::AgentAdapterError> {
        if request.stage == "worker" {
            if let Some(mut doc) = self.plan_doc.get(&self.plan_path) {
                if let Some(todo) = doc.find_next_unchecked() {
                    let index = todo.index;
                    doc.todos[index].done = true;
                    self.plan_doc.put(self.plan_path.clone(), doc);
                }
            }
        }
        Ok(prloom_core::interfaces::AgentExecuteResult::synchronous(0))
    }
}

impl Fixture {
    fn new(todos: Vec<Todo>) -> Self {
        Self::new_with_adapter(todos, |_plan_doc, _plan_path| Arc::new(FakeAgentAdapter::new()))
    }

    fn new_with_adapter(
        todos: Vec<Todo>,
        build_adapter: impl FnOnce(&FakePlanDoc, &Path) -> Arc<dyn AgentAdapter>,
    ) -> Self {
        let dir = tempdir().expect("tempdir");
        let layout = RepoLayout::new(dir.path());
        let id = PlanId::new("plan-a");
        let worktree = layout.worktree_dir(&id);
        std::fs::create_dir_all(&worktree).expect("mkdir worktree");

        let plan_path = layout.worktree_plan_md(&id);
        let plan_doc_fake = FakePlanDoc::new();
        plan_doc_fake.put(&plan_path, PlanDocument::new("Title", "Body", todos));
        let adapter = build_adapter(&plan_doc_fake, &plan_path);

        let review_provider = FakeReviewProvider::new();
        review_provider.set_cr_state("cr-1", CrState::Open);

        Self {
            _dir: dir,
            layout,
            id,
            worktree,
            vcs: Arc::new(FakeVcs::new()),
            review_provider: Arc::new(review_provider),
            plan_doc: Arc::new(plan_doc_fake),
            adapter,
            watcher: Arc::new(AlwaysFinished),
            hooks: HookRegistry::new(),
            config: base_config(),
        }
    }

    fn active_state(&self) -> PlanState {
        let mut ps = PlanState::new_draft();
        ps.status = PlanStatus::Active;
        ps.worktree_path = Some(self.worktree.clone());
        ps.branch = Some("prloom/plan-a".to_string());
        ps.base_branch = Some("main".to_string());
        ps.cr_reference = Some("cr-1".to_string());
        ps
    }

    async fn advance(&self, ps: &mut PlanState) -> Result<AdvanceOutcome, DispatcherError> {
        let global_bus = BusManager::open(self.layout.global_bus_root()).expect("open global bus");
        let review_provider: Arc<dyn ReviewProvider> = self.review_provider.clone();
        let scratch = tempdir().expect("scratch dir");
        let deps = AdvanceDeps {
            layout: &self.layout,
            vcs: &self.vcs,
            review_provider: &review_provider,
            plan_doc: &self.plan_doc,
            adapter: &self.adapter,
            watcher: &self.watcher,
            hooks: &self.hooks,
            global_bus: &global_bus,
            config: &self.config,
            agent_timeout: Duration::from_secs(1),
            scratch_root: scratch.path(),
        };
        advance_one(&deps, &self.id, ps, 1_000).await
    }
}

#[tokio::test]
async fn draft_and_queued_plans_are_skipped() {
    let fx = Fixture::new(vec![Todo::new(0, "one")]);
    for status in [PlanStatus::Draft, PlanStatus::Queued] {
        let mut ps = fx.active_state();
        ps.status = status;
        ps.worktree_path = None;
        ps.branch = None;
        ps.cr_reference = None;
        let outcome = fx.advance(&mut ps).await.expect("advance");
        assert_eq!(outcome, AdvanceOutcome::Continue);
        assert_eq!(ps.status, status);
    }
}

#[tokio::test]
async fn missing_worktree_is_skipped_not_blocked() {
    let fx = Fixture::new(vec![Todo::new(0, "one")]);
    let mut ps = fx.active_state();
    ps.worktree_path = Some(PathBuf::from("/does/not/exist"));

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Continue);
    assert!(!ps.blocked);
}

#[tokio::test]
async fn merged_cr_deletes_the_plan() {
    let fx = Fixture::new(vec![Todo::new(0, "one")]);
    fx.review_provider.set_cr_state("cr-1", CrState::Merged);
    let mut ps = fx.active_state();

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Delete);
}

#[tokio::test]
async fn closed_cr_deletes_the_plan() {
    let fx = Fixture::new(vec![Todo::new(0, "one")]);
    fx.review_provider.set_cr_state("cr-1", CrState::Closed);
    let mut ps = fx.active_state();

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Delete);
}

#[tokio::test]
async fn blocked_plans_are_left_alone() {
    let fx = Fixture::new(vec![Todo::new(0, "one")]);
    let mut ps = fx.active_state();
    ps.blocked = true;

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Continue);
    assert!(ps.blocked);
    assert_eq!(ps.last_todo_index, None, "worker step must not have run");
}

#[tokio::test]
async fn triaging_and_reviewing_plans_are_left_alone() {
    let fx = Fixture::new(vec![Todo::new(0, "one")]);
    for status in [PlanStatus::Triaging, PlanStatus::Reviewing, PlanStatus::Paused] {
        let mut ps = fx.active_state();
        ps.status = status;
        let outcome = fx.advance(&mut ps).await.expect("advance");
        assert_eq!(outcome, AdvanceOutcome::Continue);
        assert_eq!(ps.status, status);
    }
}

#[tokio::test]
async fn a_single_todo_plan_runs_the_worker_and_settles() {
    let fx = Fixture::new_with_adapter(vec![Todo::new(0, "only task")], |plan_doc, plan_path| {
        Arc::new(CompletingAdapter { plan_doc: plan_doc.clone(), plan_path: plan_path.to_path_buf() })
    });
    let mut ps = fx.active_state();

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Continue);
    assert_eq!(ps.status, PlanStatus::Review);
    assert!(!ps.blocked);
    assert_eq!(ps.last_todo_index, None);

    let calls = fx.review_provider.calls();
    assert!(calls.iter().any(|c| matches!(c, prloom_core::test_support::ReviewProviderCall::MarkCrReady { .. })));
}

#[tokio::test]
async fn retry_exhaustion_blocks_the_plan() {
    let fx = Fixture::new(vec![Todo::new(0, "stubborn task")]);
    let mut ps = fx.active_state();
    // Simulate three prior failed attempts at the same TODO index.
    ps.last_todo_index = Some(0);
    ps.todo_retry_count = prloom_core::MAX_TODO_RETRIES;

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Continue);
    assert!(ps.blocked);
    assert!(ps.last_error.as_ref().expect("error").contains("failed after 3 retries"));
}

#[tokio::test]
async fn newly_blocking_a_plan_appends_to_the_fatal_error_ledger() {
    let fx = Fixture::new(vec![Todo::new(0, "stubborn task")]);
    let mut ps = fx.active_state();
    ps.last_todo_index = Some(0);
    ps.todo_retry_count = prloom_core::MAX_TODO_RETRIES;

    fx.advance(&mut ps).await.expect("advance");
    assert!(ps.blocked);

    let ledger = std::fs::read_to_string(fx.layout.worktree_errors_log(&fx.id)).expect("errors.jsonl written");
    let mut lines = ledger.lines();
    let entry: serde_json::Value = serde_json::from_str(lines.next().expect("one line")).expect("valid json");
    assert_eq!(entry["planId"], "plan-a");
    assert!(entry["message"].as_str().expect("message string").contains("failed after 3 retries"));
    assert!(lines.next().is_none(), "exactly one entry for one newly-blocked tick");
}

#[tokio::test]
async fn an_already_blocked_plan_does_not_append_again() {
    let fx = Fixture::new(vec![Todo::new(0, "stubborn task")]);
    let mut ps = fx.active_state();
    ps.blocked = true;
    ps.last_error = Some("previously blocked".to_string());

    fx.advance(&mut ps).await.expect("advance");

    let ledger_path = fx.layout.worktree_errors_log(&fx.id);
    assert!(!ledger_path.exists(), "no new ledger entry when the plan was already blocked on entry");
}

#[tokio::test]
async fn pending_review_runs_the_review_step_and_clears_the_flag() {
    let fx = Fixture::new(vec![Todo::new(0, "done").done()]);
    let mut ps = fx.active_state();
    ps.status = PlanStatus::Review;
    ps.pending_review = true;

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Continue);
    assert!(!ps.pending_review);
    assert_eq!(ps.status, PlanStatus::Active);
    assert!(ps.poll_once);
}

#[tokio::test]
async fn feedback_poll_with_no_new_comments_does_not_trigger_triage() {
    let fx = Fixture::new(vec![Todo::new(0, "only task").done()]);
    let mut ps = fx.active_state();
    ps.last_todo_index = None;

    let outcome = fx.advance(&mut ps).await.expect("advance");
    assert_eq!(outcome, AdvanceOutcome::Continue);
    // All TODOs already settled; the plan should have moved to review
    // without ever touching triage.
    assert_eq!(ps.status, PlanStatus::Review);
}

#[tokio::test]
async fn unreadable_cr_state_surfaces_as_an_error() {
    struct FailingReviewProvider;

    #[async_trait::async_trait]
    impl ReviewProvider for FailingReviewProvider {
        async fn create_draft_cr(&self, _: &str, _: &str, _: &str) -> Result<String, ReviewProviderError> {
            unreachable!()
        }
        async fn update_cr_body(&self, _: &str, _: &str) -> Result<(), ReviewProviderError> {
            unreachable!()
        }
        async fn mark_cr_ready(&self, _: &str) -> Result<(), ReviewProviderError> {
            unreachable!()
        }
        async fn get_cr_state(&self, _: &str) -> Result<CrState, ReviewProviderError> {
            Err(ReviewProviderError::NoSuchCr("cr-1".to_string()))
        }
        async fn fetch_feedback(&self, _: &str) -> Result<prloom_core::interfaces::FeedbackBatch, ReviewProviderError> {
            unreachable!()
        }
        async fn post_comment(&self, _: &str, _: &str) -> Result<(), ReviewProviderError> {
            unreachable!()
        }
        async fn submit_review(&self, _: &str, _: prloom_core::interfaces::ReviewSubmission) -> Result<(), ReviewProviderError> {
            unreachable!()
        }
        async fn bot_login(&self) -> Result<String, ReviewProviderError> {
            unreachable!()
        }
    }

    let dir = tempdir().expect("tempdir");
    let layout = RepoLayout::new(dir.path());
    let id = PlanId::new("plan-a");
    let worktree = layout.worktree_dir(&id);
    std::fs::create_dir_all(&worktree).expect("mkdir worktree");
    let plan_doc_fake = FakePlanDoc::new();
    plan_doc_fake.put(layout.worktree_plan_md(&id), PlanDocument::new("T", "B", vec![Todo::new(0, "x")]));

    let vcs: Arc<dyn Vcs> = Arc::new(FakeVcs::new());
    let review_provider: Arc<dyn ReviewProvider> = Arc::new(FailingReviewProvider);
    let plan_doc: Arc<dyn PlanDoc> = Arc::new(plan_doc_fake);
    let adapter: Arc<dyn AgentAdapter> = Arc::new(FakeAgentAdapter::new());
    let watcher: Arc<dyn CompletionWatcher> = Arc::new(AlwaysFinished);
    let hooks = HookRegistry::new();
    let config = base_config();
    let global_bus = BusManager::open(layout.global_bus_root()).expect("open global bus");
    let scratch = tempdir().expect("scratch dir");

    let deps = AdvanceDeps {
        layout: &layout,
        vcs: &vcs,
        review_provider: &review_provider,
        plan_doc: &plan_doc,
        adapter: &adapter,
        watcher: &watcher,
        hooks: &hooks,
        global_bus: &global_bus,
        config: &config,
        agent_timeout: Duration::from_secs(1),
        scratch_root: scratch.path(),
    };

    let mut ps = PlanState::new_draft();
    ps.status = PlanStatus::Active;
    ps.worktree_path = Some(worktree);
    ps.branch = Some("prloom/plan-a".to_string());
    ps.base_branch = Some("main".to_string());
    ps.cr_reference = Some("cr-1".to_string());

    let result = advance_one(&deps, &id, &mut ps, 1_000).await;
    assert!(result.is_err());
}

#[test]
fn filter_new_feedback_drops_already_seen_and_bot_authored() {
    use prloom_core::interfaces::{FeedbackBatch, ReviewComment};
    use prloom_core::FeedbackCursors;

    let batch = FeedbackBatch {
        comments: vec![
            ReviewComment { id: 1, author: "prloom-bot".to_string(), body: "old".to_string() },
            ReviewComment { id: 5, author: "human".to_string(), body: "new".to_string() },
        ],
        reviews: vec![],
        inline_comments: vec![],
    };
    let cursors = FeedbackCursors { comments: 0, reviews: 0, inline_comments: 0 };

    let filtered = filter_new_feedback(&batch, &cursors, "prloom-bot");
    assert_eq!(filtered.comments.len(), 1);
    assert_eq!(filtered.comments[0].id, 5);
}

#[test]
fn hook_appended_todos_extracts_only_the_appended_lines() {
    let before = "# Plan\n\n- [ ] one\n";
    let after = "# Plan\n\n- [ ] one\n- [ ] two\n[ ] three\n";
    let appended = hook_appended_todos(before, after);
    assert_eq!(appended, vec!["two".to_string(), "three".to_string()]);
}

#[test]
fn hook_appended_todos_is_empty_when_markdown_is_unrelated() {
    let before = "# Plan\n";
    let after = "# Something else entirely\n";
    assert!(hook_appended_todos(before, after).is_empty());
}
