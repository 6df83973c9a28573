// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`BridgeRuntime`]: one tick over a bus root's registered bridges (§4.5).
//! Inbound bridges are polled unconditionally — pacing is each bridge's own
//! responsibility via its persisted state (§4.5: "MUST internally
//! short-circuit"). Outbound bridges are offered every action routed to
//! them that doesn't already have a delivery receipt (§3 invariant 5).

use prloom_bus::{log::read_actions, BridgeReceipts, BridgeState, BusManager};
use prloom_core::{Action, ActionId};
use tracing::{debug, warn};

use crate::traits::{ActionResult, BridgeCtx};
use crate::{BridgeError, BridgeRegistry};

/// Tally of what one [`BridgeRuntime::tick`] did, for logging/tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeTickReport {
    pub events_emitted: usize,
    pub actions_delivered: usize,
    pub actions_failed_retryable: usize,
    pub actions_failed_permanent: usize,
    pub inbound_errors: usize,
}

pub struct BridgeRuntime;

impl BridgeRuntime {
    /// Drive one tick of every bridge in `registry` against `bus`.
    pub async fn tick(
        bus: &BusManager,
        registry: &BridgeRegistry,
        now_epoch_ms: u64,
    ) -> Result<BridgeTickReport, BridgeError> {
        let ctx = BridgeCtx { now_epoch_ms };
        let mut report = BridgeTickReport::default();

        for bridge in registry.inbound() {
            let name = bridge.name();
            let prior = bus.read_bridge_state(name)?;
            match bridge.events(&ctx, prior.0).await {
                Ok(poll) => {
                    for event in &poll.events {
                        bus.emit_event(now_epoch_ms, event)?;
                    }
                    for action in &poll.actions {
                        bus.emit_action(now_epoch_ms, action)?;
                    }
                    report.events_emitted += poll.events.len();
                    bus.write_bridge_state(name, &BridgeState(poll.state))?;
                }
                Err(err) => {
                    // §4.5 failure policy: log, skip, state not advanced.
                    warn!(bridge = name, error = %err, "inbound bridge poll failed, retrying next tick");
                    report.inbound_errors += 1;
                }
            }
        }

        if !registry.outbound().is_empty() {
            let (all_actions, _) = read_actions(&bus.paths().actions_log(), 0)?;
            for bridge in registry.outbound() {
                let name = bridge.name();
                let mut receipts = bus.read_bridge_receipts(name)?;
                let routed = all_actions.iter().filter(|a| routes_to(a, name));
                let mut dirty = false;
                for action in routed {
                    if receipts.already_delivered(&action.id.0) {
                        continue;
                    }
                    dirty = true;
                    match bridge.actions(&ctx, action).await {
                        Ok(ActionResult { success: true, receipt, .. }) => {
                            receipts.record(action.id.0.clone(), receipt.unwrap_or(serde_json::Value::Null));
                            report.actions_delivered += 1;
                        }
                        Ok(ActionResult { success: false, retryable: true, error, .. }) => {
                            warn!(bridge = name, action = %action.id, error = ?error, "action delivery failed, retryable");
                            report.actions_failed_retryable += 1;
                        }
                        Ok(ActionResult { success: false, retryable: false, error, .. }) => {
                            // Non-retryable: record a failure receipt so this
                            // action is not retried forever (§4.5 is silent on
                            // this case; decided here, see DESIGN.md).
                            warn!(bridge = name, action = %action.id, error = ?error, "action delivery permanently failed");
                            receipts.record(
                                action.id.0.clone(),
                                serde_json::json!({"deliveryFailed": true, "error": error}),
                            );
                            report.actions_failed_permanent += 1;
                        }
                        Err(err) => {
                            warn!(bridge = name, action = %action.id, error = %err, "outbound bridge errored, retrying next tick");
                            report.actions_failed_retryable += 1;
                        }
                    }
                }
                if dirty {
                    bus.write_bridge_receipts(name, &receipts)?;
                } else {
                    debug!(bridge = name, "no new actions routed");
                }
            }
        }

        Ok(report)
    }
}

/// Whether `action` should be offered to the outbound bridge named `name`.
/// `*` is a wildcard target that every outbound bridge sees.
fn routes_to(action: &Action, name: &str) -> bool {
    action.target == name || action.target == "*"
}

/// Whether a given action id has already been delivered by the named
/// bridge, without needing a full tick (used by tests and by hooks that
/// want to avoid re-emitting an action that's already landed).
pub fn already_delivered(receipts: &BridgeReceipts, action_id: &ActionId) -> bool {
    receipts.already_delivered(action_id.as_str())
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
