//! S4 — event interception (spec §8). A plugin's `onEvent` hook marks any
//! event whose body contains `"!memory"` as handled; both handled and
//! pass-through events are recorded in `dispatcher.json`'s
//! `processedEventIds` exactly once each (§3 invariant 6).

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use prloom_bus::BusManager;
use prloom_core::{Event, EventId, Severity, Todo};
use prloom_hooks::{Hook, HookPoint, PluginContext};

use crate::prelude::Fixture;

/// Marks any event whose body contains `"!memory"` as handled; leaves
/// every other event's decision untouched (pass-through).
struct MemoryFilterHook {
    handled: Arc<Mutex<Vec<String>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Hook for MemoryFilterHook {
    fn name(&self) -> &str {
        "memory-filter"
    }

    async fn run(&self, markdown: String, ctx: &mut PluginContext<'_>) -> Result<String, prloom_hooks::HookError> {
        if let Some(event) = ctx.current_event() {
            self.seen.lock().push(event.id.as_str().to_string());
            if event.body.contains("!memory") {
                self.handled.lock().push(event.id.as_str().to_string());
                ctx.mark_event_handled();
            }
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
        title: "test event".to_string(),
        body: body.to_string(),
        reply_to: None,
        context: None,
    }
}

#[tokio::test]
async fn memory_events_are_marked_handled_and_every_event_is_processed_once() {
    let mut fixture = Fixture::completing(vec![Todo::new(0, "already settled")]);
    fixture.plan_doc.put(&fixture.plan_path, {
        let mut doc = fixture.plan_doc.get(&fixture.plan_path).expect("doc");
        doc.todos[0].done = true;
        doc
    });

    let handled = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    fixture
        .hooks
        .register(HookPoint::OnEvent, Arc::new(MemoryFilterHook { handled: handled.clone(), seen: seen.clone() }));

    let bus_root = fixture.layout.worktree_bus_root(&fixture.id);
    {
        let bus = BusManager::open(&bus_root).expect("open plan bus");
        bus.emit_event(1_000, &event("evt-1", "please remember this: !memory note")).expect("emit 1");
        bus.emit_event(1_000, &event("evt-2", "a regular comment")).expect("emit 2");
        bus.emit_event(1_000, &event("evt-3", "another !memory flag")).expect("emit 3");
    }

    let mut ps = fixture.active_state();
    fixture.advance(&mut ps).await.expect("advance");

    assert_eq!(seen.lock().as_slice(), ["evt-1", "evt-2", "evt-3"], "onEvent runs once per newly-observed event, in bus order");
    assert_eq!(handled.lock().as_slice(), ["evt-1", "evt-3"], "only the !memory-bearing events are marked handled");

    let bus = BusManager::open(&bus_root).expect("reopen plan bus");
    for id in ["evt-1", "evt-2", "evt-3"] {
        assert!(bus.state().processed_event_ids.contains(id), "{id} recorded in processedEventIds regardless of handled/pass-through");
    }
    assert!(!ps.blocked);
}
