// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`PluginContext`]: the plugin-facing surface (§4.6) a hook gets for the
//! duration of one call — `runAgent`, the `emit*` action helpers,
//! per-plan/global state, and `readEvents` with its own plugin-managed
//! cursor, independent of the triage cursor (§4.4's `dispatcher.json`
//! belongs to the core, not to plugins).

use std::sync::Arc;

use async_trait::async_trait;
use prloom_bus::BusManager;
use prloom_core::{Action, ActionId, ActionType, Event};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::point::HookPoint;
use crate::HookError;

/// Options for [`PluginContext::run_agent`] (§4.6: `runAgent(prompt, {files?,
/// model?, stage?})`).
#[derive(Debug, Clone, Default)]
pub struct RunAgentOptions {
    pub files: Vec<std::path::PathBuf>,
    pub model: Option<String>,
    pub stage: Option<String>,
}

/// The seam a plugin's `runAgent` call goes through. Concrete subprocess
/// spawning and completion-polling is the runner crate's job (§4.3); this
/// crate only needs a synchronous "run to completion, give me the text"
/// abstraction, implemented by whoever wires hooks into the dispatcher.
#[async_trait]
pub trait HookAgentRunner: Send + Sync {
    async fn run_agent(&self, prompt: &str, options: RunAgentOptions) -> Result<String, HookError>;
}

/// What an `onEvent` hook decided to do with the event it was handed
/// (§4.6). `None` (the default) means "pass through to triage unchanged".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDecision {
    /// Drop the event before it reaches triage.
    Handled,
    /// Skip for now; re-offer after `retry_after_ms` has elapsed.
    Deferred { reason: String, retry_after_ms: u64 },
}

/// A `readEvents` query (§4.6): plugin-managed, independent of the
/// dispatcher's own triage cursor.
#[derive(Debug, Clone, Default)]
pub struct ReadEventsQuery {
    pub types: Option<Vec<String>>,
    pub since_id: Option<String>,
    pub limit: Option<usize>,
}

/// The on-disk shape of one plugin's `plugin-state/<plugin>.json` (§4.4):
/// arbitrary user data plus the reserved cursor this crate manages for
/// `readEvents`. The cursor is invisible to `get_state`/`set_state`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PluginStateEnvelope {
    #[serde(default)]
    cursor: u64,
    #[serde(default)]
    kv: Value,
}

/// The context object handed to a hook for one invocation (§4.6).
pub struct PluginContext<'a> {
    plugin_name: String,
    point: HookPoint,
    plan_bus: &'a BusManager,
    global_bus: &'a BusManager,
    agent_runner: Option<Arc<dyn HookAgentRunner>>,
    now_epoch_ms: u64,
    current_event: Option<Event>,
    pending_actions: Vec<Action>,
    event_decision: Option<EventDecision>,
}

impl<'a> PluginContext<'a> {
    pub fn new(
        plugin_name: impl Into<String>,
        point: HookPoint,
        plan_bus: &'a BusManager,
        global_bus: &'a BusManager,
        agent_runner: Option<Arc<dyn HookAgentRunner>>,
        now_epoch_ms: u64,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            point,
            plan_bus,
            global_bus,
            agent_runner,
            now_epoch_ms,
            current_event: None,
            pending_actions: Vec::new(),
            event_decision: None,
        }
    }

    /// Set for the duration of an `onEvent` call (§4.6: "runs once per
    /// newly-observed bus event").
    pub fn with_current_event(mut self, event: Event) -> Self {
        self.current_event = Some(event);
        self
    }

    pub fn point(&self) -> HookPoint {
        self.point
    }

    pub fn current_event(&self) -> Option<&Event> {
        self.current_event.as_ref()
    }

    pub async fn run_agent(&self, prompt: &str, options: RunAgentOptions) -> Result<String, HookError> {
        match &self.agent_runner {
            Some(runner) => runner.run_agent(prompt, options).await,
            None => Err(HookError::AgentRunFailed("no agent runner configured".to_string())),
        }
    }

    fn emit(&mut self, kind: ActionType, target: impl Into<String>, payload: Value) {
        let action = Action {
            id: ActionId::new(format!("{}-{}", self.plugin_name, uuid::Uuid::new_v4())),
            kind,
            target: target.into(),
            payload,
        };
        self.pending_actions.push(action);
    }

    pub fn emit_action(&mut self, target: impl Into<String>, payload: Value) {
        self.emit(ActionType::Other, target, payload);
    }

    pub fn emit_comment(&mut self, target: impl Into<String>, body: impl Into<String>) {
        self.emit(ActionType::Comment, target, serde_json::json!({"body": body.into()}));
    }

    pub fn emit_review(&mut self, target: impl Into<String>, verdict: impl Into<String>, summary: impl Into<String>) {
        self.emit(
            ActionType::Review,
            target,
            serde_json::json!({"verdict": verdict.into(), "summary": summary.into()}),
        );
    }

    pub fn emit_merge(&mut self, target: impl Into<String>) {
        self.emit(ActionType::Merge, target, serde_json::json!({}));
    }

    /// Actions accumulated during this call, to be flushed to the bus by
    /// the caller once the hook returns successfully.
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    pub fn mark_event_handled(&mut self) {
        self.event_decision = Some(EventDecision::Handled);
    }

    pub fn mark_event_deferred(&mut self, reason: impl Into<String>, retry_after_ms: u64) {
        self.event_decision = Some(EventDecision::Deferred { reason: reason.into(), retry_after_ms });
    }

    pub fn take_event_decision(&mut self) -> Option<EventDecision> {
        self.event_decision.take()
    }

    fn plugin_state_envelope(&self, scope: Scope) -> Result<PluginStateEnvelope, HookError> {
        let bus = self.bus_for(scope);
        let raw = bus.read_plugin_state(&self.plugin_name)?;
        Ok(serde_json::from_value(raw.0).unwrap_or_default())
    }

    fn write_plugin_state_envelope(&self, scope: Scope, envelope: &PluginStateEnvelope) -> Result<(), HookError> {
        let bus = self.bus_for(scope);
        let value = serde_json::to_value(envelope).unwrap_or(Value::Null);
        bus.write_plugin_state(&self.plugin_name, &prloom_bus::PluginState(value))?;
        Ok(())
    }

    fn bus_for(&self, scope: Scope) -> &BusManager {
        match scope {
            Scope::Plan => self.plan_bus,
            Scope::Global => self.global_bus,
        }
    }

    pub fn get_state(&self) -> Result<Value, HookError> {
        Ok(self.plugin_state_envelope(Scope::Plan)?.kv)
    }

    pub fn set_state(&self, value: Value) -> Result<(), HookError> {
        let mut envelope = self.plugin_state_envelope(Scope::Plan)?;
        envelope.kv = value;
        self.write_plugin_state_envelope(Scope::Plan, &envelope)
    }

    pub fn get_global_state(&self) -> Result<Value, HookError> {
        Ok(self.plugin_state_envelope(Scope::Global)?.kv)
    }

    pub fn set_global_state(&self, value: Value) -> Result<(), HookError> {
        let mut envelope = self.plugin_state_envelope(Scope::Global)?;
        envelope.kv = value;
        self.write_plugin_state_envelope(Scope::Global, &envelope)
    }

    /// Read events from the per-plan bus through this plugin's own cursor,
    /// independent of the dispatcher's triage cursor (§4.6).
    pub fn read_events(&self, query: &ReadEventsQuery) -> Result<Vec<Event>, HookError> {
        let mut envelope = self.plugin_state_envelope(Scope::Plan)?;
        let (events, new_offset) = prloom_bus::log::read_events(&self.plan_bus.paths().events_log(), envelope.cursor)?;
        envelope.cursor = new_offset;
        self.write_plugin_state_envelope(Scope::Plan, &envelope)?;

        let mut filtered: Vec<Event> = events
            .into_iter()
            .filter(|e| query.types.as_ref().map_or(true, |types| types.contains(&e.kind)))
            .filter(|e| query.since_id.as_ref().map_or(true, |since| e.id.as_str() > since.as_str()))
            .collect();

        if let Some(limit) = query.limit {
            filtered.truncate(limit);
        }
        Ok(filtered)
    }

    pub fn now_epoch_ms(&self) -> u64 {
        self.now_epoch_ms
    }
}

enum Scope {
    Plan,
    Global,
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
