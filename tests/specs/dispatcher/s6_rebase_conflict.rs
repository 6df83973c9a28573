//! S6 — rebase conflict on triage (spec §8).

use std::sync::Arc;

use async_trait::async_trait;
use prloom_core::interfaces::{
    AgentAdapter, AgentAdapterError, AgentExecuteRequest, AgentExecuteResult, FeedbackBatch, RebaseOutcome,
    ReviewComment,
};
use prloom_core::test_support::ReviewProviderCall;
use prloom_core::Todo;
use prloom_runners::triage_result_path;

use crate::prelude::Fixture;

/// Requests a rebase on the first `triage` stage call it sees; the worker
/// stage is never expected to be exercised in this scenario (no new TODO
/// work is due — feedback alone drives triage).
struct RequestRebaseAdapter;

#[async_trait]
impl AgentAdapter for RequestRebaseAdapter {
    async fn execute(&self, request: AgentExecuteRequest) -> Result<AgentExecuteResult, AgentAdapterError> {
        if request.stage == "triage" {
            let path = triage_result_path(&request.cwd);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir scratch");
            std::fs::write(&path, r#"{"rebase": true}"#).expect("write result");
        }
        Ok(AgentExecuteResult::synchronous(0))
    }
}

#[tokio::test]
async fn a_conflicting_rebase_blocks_and_posts_instructions() {
    let mut fixture = Fixture::build(vec![Todo::new(0, "Already done")], |_, _| Arc::new(RequestRebaseAdapter) as Arc<dyn AgentAdapter>);
    // The worker path is skipped entirely by having the sole TODO already
    // settled; only feedback-driven triage is exercised this tick.
    fixture.plan_doc.put(
        &fixture.plan_path,
        {
            let mut doc = fixture.plan_doc.get(&fixture.plan_path).expect("doc");
            doc.todos[0].done = true;
            doc
        },
    );
    fixture.vcs.set_rebase_outcome(RebaseOutcome::conflict(["src/lib.rs"]));
    fixture
        .review_provider
        .queue_feedback("cr-1", FeedbackBatch { comments: vec![ReviewComment { id: 1, author: "reviewer".to_string(), body: "please rebase".to_string() }], reviews: vec![], inline_comments: vec![] });

    let mut ps = fixture.active_state();
    fixture.advance(&mut ps).await.expect("advance");

    assert!(ps.blocked);
    let last_error = ps.last_error.expect("last_error set");
    assert!(last_error.starts_with("Rebase conflict:"), "last_error was {last_error:?}");

    let posted = fixture
        .review_provider
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ReviewProviderCall::PostComment { body, .. } => Some(body),
            _ => None,
        })
        .expect("a comment was posted");
    assert!(posted.contains("git rebase --continue"));
    assert!(posted.contains("plan-a"), "comment mentions the plan id so a human knows which plan to unblock");
}
