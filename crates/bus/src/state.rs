// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The JSON shapes persisted under `<bus_root>/state/` and
//! `<bus_root>/plugin-state/` (§4.4).

use std::collections::HashMap;

use prloom_core::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dedup::{ProcessedIds, DEFAULT_PROCESSED_IDS_CAP};

/// An entry in `dispatcher.json`'s `deferredEventIds` (§4.6): an event a
/// plugin deferred rather than handled or passed through, with the reason,
/// the epoch-ms timestamp at which it becomes eligible again, and the event
/// body itself so it can actually be re-offered to triage once it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredEvent {
    pub reason: String,
    #[serde(rename = "deferredUntil")]
    pub deferred_until_epoch_ms: u64,
    pub event: Event,
}

/// `state/dispatcher.json` (§4.4): the core's own bus cursors plus the
/// triage-handled set and deferred events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherBusState {
    #[serde(rename = "eventsOffset")]
    pub events_offset: u64,
    #[serde(rename = "actionsOffset")]
    pub actions_offset: u64,
    #[serde(rename = "processedEventIds", with = "processed_ids_as_vec")]
    pub processed_event_ids: ProcessedIds,
    #[serde(rename = "deferredEventIds", default)]
    pub deferred_event_ids: HashMap<String, DeferredEvent>,
}

impl Default for DispatcherBusState {
    fn default() -> Self {
        Self {
            events_offset: 0,
            actions_offset: 0,
            processed_event_ids: ProcessedIds::new(),
            deferred_event_ids: HashMap::new(),
        }
    }
}

impl DispatcherBusState {
    /// Ids of deferred events whose backoff has elapsed and are eligible
    /// for triage again (§4.6).
    pub fn ready_deferred_events(&self, now_epoch_ms: u64) -> Vec<String> {
        self.deferred_event_ids
            .iter()
            .filter(|(_, deferred)| now_epoch_ms >= deferred.deferred_until_epoch_ms)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn prune_processed_ids(&mut self) {
        self.processed_event_ids.prune(DEFAULT_PROCESSED_IDS_CAP);
    }
}

mod processed_ids_as_vec {
    use super::ProcessedIds;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(ids: &ProcessedIds, serializer: S) -> Result<S::Ok, S::Error> {
        let vec: Vec<&str> = ids.iter().collect();
        vec.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProcessedIds, D::Error> {
        let vec: Vec<String> = Vec::deserialize(deserializer)?;
        Ok(ProcessedIds::from_ordered(vec))
    }
}

/// `state/bridge.<name>.json`: opaque, bridge-owned state (§4.5 — "returns
/// new state verbatim for persistence").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeState(pub Value);

/// `state/bridge.<name>.actions.json` (§4.5): the delivery receipts that
/// make bridge delivery idempotent across ticks (§3 invariant 5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeReceipts {
    #[serde(rename = "deliveredActions", default)]
    pub delivered_actions: HashMap<String, Value>,
}

impl BridgeReceipts {
    pub fn already_delivered(&self, action_id: &str) -> bool {
        self.delivered_actions.contains_key(action_id)
    }

    pub fn record(&mut self, action_id: impl Into<String>, receipt: Value) {
        self.delivered_actions.insert(action_id.into(), receipt);
    }
}

/// `plugin-state/<plugin>.json`: a free-form JSON value a plugin owns
/// entirely (§3, §4.6). The per-plan/repo-global scoping is a matter of
/// which [`crate::layout::BusPaths`] root this is read from, not a field on
/// the value itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginState(pub Value);

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
