//! S3 — `beforeFinish` hook blocks finishing (spec §8).

use std::sync::Arc;

use async_trait::async_trait;
use prloom_core::test_support::ReviewProviderCall;
use prloom_core::{PlanStatus, Todo};
use prloom_hooks::{Hook, HookPoint, PluginContext};

use crate::prelude::Fixture;

/// Appends `- [ ] Added by hook` to the plan body every time it runs,
/// mirroring S3's "Hook appends ... on every invocation".
struct AlwaysAppendHook;

#[async_trait]
impl Hook for AlwaysAppendHook {
    fn name(&self) -> &str {
        "always-append"
    }

    async fn run(&self, markdown: String, _ctx: &mut PluginContext<'_>) -> Result<String, prloom_hooks::HookError> {
        Ok(format!("{markdown}\n- [ ] Added by hook"))
    }
}

#[tokio::test]
async fn hook_appended_todo_keeps_the_plan_active_and_the_cr_not_ready() {
    let mut fixture = Fixture::completing(vec![Todo::new(0, "Original task")]);
    fixture.hooks.register(HookPoint::BeforeFinish, Arc::new(AlwaysAppendHook));
    let mut ps = fixture.active_state();

    fixture.advance(&mut ps).await.expect("advance");

    assert_eq!(ps.status, PlanStatus::Active, "hook-gated finish keeps the plan active, not review");
    assert!(!fixture.review_provider.calls().iter().any(|c| matches!(c, ReviewProviderCall::MarkCrReady { .. })),
        "CR must not be marked ready while beforeFinish keeps appending TODOs");

    let doc = fixture.plan_doc.get(&fixture.plan_path).expect("plan doc present");
    assert!(doc.todos[0].done, "original TODO is still marked done");
    assert_eq!(doc.todos[0].text, "Original task");
    assert!(doc.todos.iter().any(|t| t.text == "Added by hook" && !t.done), "hook-appended TODO is present and unchecked");
}
