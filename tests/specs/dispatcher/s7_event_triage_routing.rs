//! S7 — onEvent pass-through and deferred re-offer (spec §4.6). An event no
//! hook claims reaches triage the same tick; an event a hook defers is
//! re-offered, body and all, once its backoff elapses.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use prloom_bus::BusManager;
use prloom_core::interfaces::{AgentAdapter, AgentAdapterError, AgentExecuteRequest, AgentExecuteResult};
use prloom_core::{Event, EventId, Severity, Todo};
use prloom_hooks::{Hook, HookPoint, PluginContext};
use prloom_runners::triage_result_path;

use crate::prelude::Fixture;

/// Records every stage it was asked to run, and answers the `triage`
/// stage with a non-conflicting result so triage settles cleanly.
struct RecordingAdapter {
    stages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AgentAdapter for RecordingAdapter {
    async fn execute(&self, request: AgentExecuteRequest) -> Result<AgentExecuteResult, AgentAdapterError> {
        self.stages.lock().push(request.stage.clone());
        if request.stage == "triage" {
            let path = triage_result_path(&request.cwd);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir scratch");
            std::fs::write(&path, r#"{"rebase": false}"#).expect("write result");
        }
        Ok(AgentExecuteResult::synchronous(0))
    }
}

/// Defers the first event it ever sees, by a fixed backoff; passes every
/// other event through untouched.
struct DeferOnceHook {
    deferred_once: Mutex<bool>,
}

#[async_trait]
impl Hook for DeferOnceHook {
    fn name(&self) -> &str {
        "defer-once"
    }

    async fn run(&self, markdown: String, ctx: &mut PluginContext<'_>) -> Result<String, prloom_hooks::HookError> {
        let mut deferred_once = self.deferred_once.lock();
        if !*deferred_once {
            *deferred_once = true;
            ctx.mark_event_deferred("waiting for rate limit", 5_000);
        }
        Ok(markdown)
    }
}

fn event(id: &str, body: &str) -> Event {
    Event {
        id: EventId::new(id),
        source: "test-bridge".to_string(),
        kind: "comment".to_string(),
        severity: Severity::Info,
        title: "a bus event".to_string(),
        body: body.to_string(),
        reply_to: None,
        context: None,
    }
}

#[tokio::test]
async fn a_pass_through_event_reaches_triage_the_same_tick() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let fixture = Fixture::build(vec![Todo::new(0, "still open")], |_, _| Arc::new(RecordingAdapter { stages: stages.clone() }) as Arc<dyn AgentAdapter>);

    let bus_root = fixture.layout.worktree_bus_root(&fixture.id);
    {
        let bus = BusManager::open(&bus_root).expect("open plan bus");
        bus.emit_event(1_000, &event("evt-1", "unclaimed event")).expect("emit");
    }

    let mut ps = fixture.active_state();
    fixture.advance(&mut ps).await.expect("advance");

    assert!(stages.lock().contains(&"triage".to_string()), "no onEvent hook claimed the event, so it must reach triage");
    assert!(!ps.blocked);
    assert_eq!(ps.status, prloom_core::PlanStatus::Active);

    let bus = BusManager::open(&bus_root).expect("reopen plan bus");
    assert!(bus.state().processed_event_ids.contains("evt-1"));
    assert!(bus.state().deferred_event_ids.is_empty());
}

#[tokio::test]
async fn a_deferred_event_is_re_offered_with_its_body_once_the_backoff_elapses() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let mut fixture = Fixture::build(vec![Todo::new(0, "still open")], |_, _| Arc::new(RecordingAdapter { stages: stages.clone() }) as Arc<dyn AgentAdapter>);
    fixture.hooks.register(HookPoint::OnEvent, Arc::new(DeferOnceHook { deferred_once: Mutex::new(false) }));

    let bus_root = fixture.layout.worktree_bus_root(&fixture.id);
    {
        let bus = BusManager::open(&bus_root).expect("open plan bus");
        bus.emit_event(1_000, &event("evt-1", "please rate limit me")).expect("emit");
    }

    let mut ps = fixture.active_state();
    fixture.advance_at(&mut ps, 1_000).await.expect("advance (deferred)");

    assert!(!stages.lock().contains(&"triage".to_string()), "a deferred event must not reach triage before its backoff elapses");
    {
        let bus = BusManager::open(&bus_root).expect("reopen plan bus");
        let deferred = bus.state().deferred_event_ids.get("evt-1").expect("event is parked as deferred");
        assert_eq!(deferred.event.body, "please rate limit me", "the deferred entry retains the original event body");
    }

    // Second tick, past the backoff: no new bus events, but the deferred
    // one is now ready and must be re-offered straight to triage.
    fixture.advance_at(&mut ps, 10_000).await.expect("advance (re-offer)");

    assert!(stages.lock().contains(&"triage".to_string()), "the deferred event's body survived and reached triage once ready");
    let bus = BusManager::open(&bus_root).expect("reopen plan bus");
    assert!(bus.state().deferred_event_ids.is_empty(), "the re-offered event is removed from the deferred set");
}

