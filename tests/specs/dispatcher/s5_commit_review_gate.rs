//! S5 — commit-review gate, reject-then-approve (spec §8).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use prloom_core::config::CommitReviewConfig;
use prloom_core::interfaces::{AgentAdapter, AgentAdapterError, AgentExecuteRequest, AgentExecuteResult};
use prloom_core::test_support::FakePlanDoc;
use prloom_core::{PlanStatus, Todo};
use prloom_runners::commit_review_result_path;

use crate::prelude::Fixture;

/// Completes the worker's TODO on every `worker` stage call; on
/// `commitReview` stage calls, rejects the first time and approves every
/// time after (mirroring S5's "reviewer un-checks on first run and
/// approves on second").
struct RejectThenApproveAdapter {
    plan_doc: FakePlanDoc,
    plan_path: PathBuf,
    commit_review_calls: Arc<AtomicU32>,
}

#[async_trait]
impl AgentAdapter for RejectThenApproveAdapter {
    async fn execute(&self, request: AgentExecuteRequest) -> Result<AgentExecuteResult, AgentAdapterError> {
        match request.stage.as_str() {
            "worker" => {
                if let Some(mut doc) = self.plan_doc.get(&self.plan_path) {
                    if let Some(todo) = doc.find_next_unchecked() {
                        let index = todo.index;
                        doc.todos[index].done = true;
                        self.plan_doc.put(self.plan_path.clone(), doc);
                    }
                }
            }
            "commitReview" => {
                let call = self.commit_review_calls.fetch_add(1, Ordering::SeqCst);
                let verdict = if call == 0 { "reject" } else { "approve" };
                let path = commit_review_result_path(&request.cwd);
                std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir scratch");
                std::fs::write(&path, format!(r#"{{"verdict": "{verdict}"}}"#)).expect("write result");
            }
            _ => {}
        }
        Ok(AgentExecuteResult::synchronous(0))
    }
}

#[tokio::test]
async fn reject_then_approve_reaches_review_without_blocking() {
    let commit_review_calls = Arc::new(AtomicU32::new(0));
    let mut fixture = Fixture::build(vec![Todo::new(0, "Ship it")], |plan_doc, plan_path| {
        Arc::new(RejectThenApproveAdapter {
            plan_doc: plan_doc.clone(),
            plan_path: plan_path.to_path_buf(),
            commit_review_calls: commit_review_calls.clone(),
        })
    });
    fixture.config.commit_review = CommitReviewConfig { enabled: true, max_loops: 2, agent: None, model: None, require_manual_resume: false };
    let mut ps = fixture.active_state();

    // Tick 1: worker commits, commit-review rejects -> TODO un-checked again, not blocked.
    fixture.advance(&mut ps).await.expect("advance 1");
    assert!(!ps.blocked, "a single rejection must not block the plan (max_loops=2)");
    assert_eq!(ps.commit_review.map(|a| a.loop_count), Some(1));
    let doc = fixture.plan_doc.get(&fixture.plan_path).expect("doc");
    assert!(!doc.todos[0].done, "commit-review rejection un-checks the TODO");

    // Tick 2: worker re-commits, commit-review approves -> plan settles.
    fixture.advance(&mut ps).await.expect("advance 2");

    assert!(!ps.blocked);
    assert_eq!(ps.status, PlanStatus::Review);
    assert_eq!(commit_review_calls.load(Ordering::SeqCst), 2, "worker, reviewer(reject), worker, reviewer(approve)");
}
