//! S1 — happy path, 3 TODOs, hosting enabled (spec §8).

use std::sync::Arc;
use std::time::Duration;

use prloom_bus::BusManager;
use prloom_core::interfaces::{AgentAdapter, CrState, PlanDoc, ReviewProvider, Vcs};
use prloom_core::test_support::{FakePlanDoc, FakeReviewProvider, FakeVcs, ReviewProviderCall, VcsCall};
use prloom_core::{PlanDocument, PlanId, PlanStatus, Todo};
use prloom_dispatcher::{advance_one, ingest_one, AdvanceDeps, IngestDeps, InboxMeta, RepoLayout};
use prloom_hooks::HookRegistry;
use prloom_runners::CompletionWatcher;

use crate::prelude::{base_config, AlwaysFinished, CompletingAdapter};

#[tokio::test]
async fn three_todos_reach_review_with_exactly_one_draft_and_one_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = RepoLayout::new(dir.path());
    let id = PlanId::new("plan-a");

    let plan_doc_fake = FakePlanDoc::new();
    let todos = vec![Todo::new(0, "Setup DB"), Todo::new(1, "Create API"), Todo::new(2, "Add tests")];
    plan_doc_fake.put(layout.inbox_plan_md(&id), PlanDocument::new("Ship it", "## Objective\n\nShip it.".to_string(), todos));

    let vcs_concrete = Arc::new(FakeVcs::new());
    let vcs: Arc<dyn Vcs> = vcs_concrete.clone();
    let review_provider = Arc::new(FakeReviewProvider::new());
    let review_provider_dyn: Arc<dyn ReviewProvider> = review_provider.clone();
    let plan_doc: Arc<dyn PlanDoc> = Arc::new(plan_doc_fake.clone());

    let ingest_deps = IngestDeps {
        layout: &layout,
        vcs: &vcs,
        review_provider: &review_provider_dyn,
        plan_doc: &plan_doc,
        base_branch: "main",
    };
    let meta = InboxMeta { status: PlanStatus::Queued, agent: None, preset: None, source: None, hidden: false };
    let ingested = ingest_one(&ingest_deps, &id, &meta).await.expect("ingest").expect("not skipped");
    let mut ps = ingested.state;
    let cr = ps.cr_reference.clone().expect("cr reference set");

    assert_eq!(review_provider.calls().len(), 1, "exactly one create-draft call so far");
    assert!(matches!(review_provider.calls()[0], ReviewProviderCall::CreateDraftCr { .. }));
    assert_eq!(review_provider.get_cr_state(&cr).await.unwrap(), CrState::Draft);

    std::fs::create_dir_all(ps.worktree_path.clone().unwrap()).expect("mkdir worktree");
    let worktree_plan_path = layout.worktree_plan_md(&id);

    let watcher: Arc<dyn CompletionWatcher> = Arc::new(AlwaysFinished);
    let hooks = HookRegistry::new();
    let config = base_config();
    let adapter: Arc<dyn AgentAdapter> = Arc::new(CompletingAdapter {
        plan_doc: plan_doc_fake.clone(),
        plan_path: worktree_plan_path.clone(),
        fail_stage: None,
    });

    for _ in 0..3 {
        let global_bus = BusManager::open(layout.global_bus_root()).expect("open global bus");
        let scratch = tempfile::tempdir().expect("scratch dir");
        let deps = AdvanceDeps {
            layout: &layout,
            vcs: &vcs,
            review_provider: &review_provider_dyn,
            plan_doc: &plan_doc,
            adapter: &adapter,
            watcher: &watcher,
            hooks: &hooks,
            global_bus: &global_bus,
            config: &config,
            agent_timeout: Duration::from_secs(1),
            scratch_root: scratch.path(),
        };
        advance_one(&deps, &id, &mut ps, 1_000).await.expect("advance");
    }

    let final_doc = plan_doc_fake.get(&worktree_plan_path).expect("plan doc present");
    assert!(final_doc.todos.iter().all(|t| t.done), "all three TODOs marked done");
    assert_eq!(ps.status, PlanStatus::Review);
    assert!(!ps.blocked);

    let calls = review_provider.calls();
    let draft_count = calls.iter().filter(|c| matches!(c, ReviewProviderCall::CreateDraftCr { .. })).count();
    let body_edits = calls.iter().filter(|c| matches!(c, ReviewProviderCall::UpdateCrBody { .. })).count();
    let ready_count = calls.iter().filter(|c| matches!(c, ReviewProviderCall::MarkCrReady { .. })).count();
    assert_eq!(draft_count, 1);
    assert_eq!(body_edits, 3, "CR body is re-pushed after every settled TODO, not just at finalization");
    assert_eq!(ready_count, 1);
    assert_eq!(review_provider.get_cr_state(&cr).await.unwrap(), CrState::Open, "no longer draft");

    let commit_messages: Vec<String> = vcs_concrete
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            VcsCall::CommitAll { message, .. } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(commit_messages.len(), 3, "one commit per TODO");
    for text in ["Setup DB", "Create API", "Add tests"] {
        assert!(commit_messages.iter().any(|m| m.contains(text)), "missing commit for {text}");
    }
}
