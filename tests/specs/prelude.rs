//! Shared fixture for the dispatcher-level end-to-end scenarios (§8
//! "Concrete end-to-end scenarios"). Mirrors `prloom-dispatcher`'s own
//! `advance_tests.rs` fixture, rebuilt against the crate's public API
//! since this test target only sees what's exported from each crate.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prloom_bus::BusManager;
use prloom_core::config::{AgentsConfig, BusConfig, CommitReviewConfig, LoopGuardConfig, ReviewConfig};
use prloom_core::interfaces::{
    AgentAdapter, AgentAdapterError, AgentExecuteRequest, AgentExecuteResult, CrState, PlanDoc, ReviewProvider, Vcs,
};
use prloom_core::test_support::{FakeAgentAdapter, FakePlanDoc, FakeReviewProvider, FakeVcs};
use prloom_core::{Config, PlanDocument, PlanId, PlanState, PlanStatus, RunnerHandle, Todo};
use prloom_dispatcher::{advance_one, AdvanceDeps, AdvanceOutcome, DispatcherError, RepoLayout};
use prloom_hooks::HookRegistry;
use prloom_runners::CompletionWatcher;

/// A watcher that reports every runner finished immediately; `advance_one`
/// checks `is_finished` before ever sleeping, so this never blocks a test.
pub struct AlwaysFinished;

#[async_trait]
impl CompletionWatcher for AlwaysFinished {
    async fn is_finished(&self, _handle: &RunnerHandle, _exitcode_path: &Path) -> bool {
        true
    }
}

/// An adapter that, on a `"worker"`-stage request, marks the plan's first
/// unchecked TODO done before returning synchronously — standing in for
/// the coding agent actually doing the work (`FakeAgentAdapter` alone only
/// records calls).
pub struct CompletingAdapter {
    pub plan_doc: FakePlanDoc,
    pub plan_path: PathBuf,
    pub fail_stage: Option<&'static str>,
}

#[async_trait]
impl AgentAdapter for CompletingAdapter {
    async fn execute(&self, request: AgentExecuteRequest) -> Result<AgentExecuteResult, AgentAdapterError> {
        if self.fail_stage == Some(request.stage.as_str()) {
            return Err(AgentAdapterError::SpawnFailed("scripted failure".to_string()));
        }
        if request.stage == "worker" {
            if let Some(mut doc) = self.plan_doc.get(&self.plan_path) {
                if let Some(todo) = doc.find_next_unchecked() {
                    let index = todo.index;
                    doc.todos[index].done = true;
                    self.plan_doc.put(self.plan_path.clone(), doc);
                }
            }
        }
        Ok(AgentExecuteResult::synchronous(0))
    }
}

/// A worker adapter that never completes a TODO, mirroring S2's "script
/// that never checks the TODO".
pub struct NeverCompletingAdapter;

#[async_trait]
impl AgentAdapter for NeverCompletingAdapter {
    async fn execute(&self, _request: AgentExecuteRequest) -> Result<AgentExecuteResult, AgentAdapterError> {
        Ok(AgentExecuteResult::synchronous(0))
    }
}

pub fn base_config() -> Config {
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

pub struct Fixture {
    pub _dir: tempfile::TempDir,
    pub layout: RepoLayout,
    pub id: PlanId,
    pub worktree: PathBuf,
    pub plan_path: PathBuf,
    pub vcs: Arc<FakeVcs>,
    pub review_provider: Arc<FakeReviewProvider>,
    pub plan_doc: FakePlanDoc,
    pub adapter: Arc<dyn AgentAdapter>,
    pub watcher: Arc<dyn CompletionWatcher>,
    pub hooks: HookRegistry,
    pub config: Config,
}

impl Fixture {
    /// Build a fixture whose worker step actually completes TODOs, one at
    /// a time, via `CompletingAdapter`.
    pub fn completing(todos: Vec<Todo>) -> Self {
        Self::build(todos, |plan_doc, plan_path| {
            Arc::new(CompletingAdapter { plan_doc: plan_doc.clone(), plan_path: plan_path.to_path_buf(), fail_stage: None })
        })
    }

    /// Build a fixture whose worker step never completes any TODO (S2).
    pub fn never_completing(todos: Vec<Todo>) -> Self {
        Self::build(todos, |_plan_doc, _plan_path| Arc::new(NeverCompletingAdapter))
    }

    pub fn build(todos: Vec<Todo>, build_adapter: impl FnOnce(&FakePlanDoc, &Path) -> Arc<dyn AgentAdapter>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = RepoLayout::new(dir.path());
        let id = PlanId::new("plan-a");
        let worktree = layout.worktree_dir(&id);
        std::fs::create_dir_all(&worktree).expect("mkdir worktree");

        let plan_path = layout.worktree_plan_md(&id);
        let plan_doc_fake = FakePlanDoc::new();
        plan_doc_fake.put(&plan_path, PlanDocument::new("Title", "Objective: ship it.", todos));
        let adapter = build_adapter(&plan_doc_fake, &plan_path);

        let review_provider = FakeReviewProvider::new();
        review_provider.set_cr_state("cr-1", CrState::Open);

        Self {
            _dir: dir,
            layout,
            id,
            worktree,
            plan_path,
            vcs: Arc::new(FakeVcs::new()),
            review_provider: Arc::new(review_provider),
            plan_doc: plan_doc_fake,
            adapter,
            watcher: Arc::new(AlwaysFinished),
            hooks: HookRegistry::new(),
            config: base_config(),
        }
    }

    pub fn active_state(&self) -> PlanState {
        let mut ps = PlanState::new_draft();
        ps.status = PlanStatus::Active;
        ps.worktree_path = Some(self.worktree.clone());
        ps.branch = Some("prloom/plan-a".to_string());
        ps.base_branch = Some("main".to_string());
        ps.cr_reference = Some("cr-1".to_string());
        ps
    }

    pub async fn advance(&self, ps: &mut PlanState) -> Result<AdvanceOutcome, DispatcherError> {
        self.advance_at(ps, 1_000).await
    }

    pub async fn advance_at(&self, ps: &mut PlanState, now_epoch_ms: u64) -> Result<AdvanceOutcome, DispatcherError> {
        let global_bus = BusManager::open(self.layout.global_bus_root()).expect("open global bus");
        let vcs: Arc<dyn Vcs> = self.vcs.clone();
        let review_provider: Arc<dyn ReviewProvider> = self.review_provider.clone();
        let plan_doc: Arc<dyn PlanDoc> = Arc::new(self.plan_doc.clone());
        let scratch = tempfile::tempdir().expect("scratch dir");
        let deps = AdvanceDeps {
            layout: &self.layout,
            vcs: &vcs,
            review_provider: &review_provider,
            plan_doc: &plan_doc,
            adapter: &self.adapter,
            watcher: &self.watcher,
            hooks: &self.hooks,
            global_bus: &global_bus,
            config: &self.config,
            agent_timeout: Duration::from_secs(1),
            scratch_root: scratch.path(),
        };
        advance_one(&deps, &self.id, ps, now_epoch_ms).await
    }
}
