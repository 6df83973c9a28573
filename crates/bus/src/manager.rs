// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`BusManager`]: the single entry point dispatcher/bridge/hook code uses
//! to read and write a bus root, so that no caller has to remember the
//! read-dedup-persist dance (§4.4) by hand.

use std::path::Path;

use prloom_core::{Action, Event};

use crate::layout::BusPaths;
use crate::log::{append_action, append_event, read_actions, read_events};
use crate::state::DispatcherBusState;
use crate::{atomic, BusError};

/// Owns one bus root (either a per-plan or the repo-global bus, §4.4) and
/// the dispatcher-side cursor/dedup state that goes with it.
pub struct BusManager {
    paths: BusPaths,
    state: DispatcherBusState,
}

impl BusManager {
    /// Load a bus root, recovering `dispatcher.json` (or defaulting it if
    /// this is the first tick against a fresh root).
    pub fn open(root: impl Into<std::path::PathBuf>) -> Result<Self, BusError> {
        let paths = BusPaths::new(root);
        let state = atomic::read_json_or_default(&paths.dispatcher_state())?;
        Ok(Self { paths, state })
    }

    pub fn paths(&self) -> &BusPaths {
        &self.paths
    }

    pub fn state(&self) -> &DispatcherBusState {
        &self.state
    }

    /// Read events new since the last persisted cursor, filter out ones
    /// already processed, and advance both the offset and the
    /// processed-id set in memory. Call [`BusManager::persist`] afterward
    /// to make the advance durable.
    pub fn poll_new_events(&mut self) -> Result<Vec<Event>, BusError> {
        let (events, new_offset) = read_events(&self.paths.events_log(), self.state.events_offset)?;
        self.state.events_offset = new_offset;
        let fresh = crate::dedup::deduplicate_events(events, &mut self.state.processed_event_ids);
        self.state.prune_processed_ids();
        Ok(fresh)
    }

    /// Read actions new since the last persisted cursor (used by bridges,
    /// which track their own delivery receipts separately via
    /// [`crate::state::BridgeReceipts`] rather than this manager's
    /// processed-id set).
    pub fn poll_new_actions(&mut self) -> Result<Vec<Action>, BusError> {
        let (actions, new_offset) = read_actions(&self.paths.actions_log(), self.state.actions_offset)?;
        self.state.actions_offset = new_offset;
        Ok(actions)
    }

    pub fn emit_event(&self, now_epoch_ms: u64, event: &Event) -> Result<(), BusError> {
        append_event(&self.paths.events_log(), now_epoch_ms, event)
    }

    pub fn emit_action(&self, now_epoch_ms: u64, action: &Action) -> Result<(), BusError> {
        append_action(&self.paths.actions_log(), now_epoch_ms, action)
    }

    /// Write `dispatcher.json` atomically (§5: state.json is rewritten
    /// write-temp-then-rename at the end of each tick).
    pub fn persist(&self) -> Result<(), BusError> {
        atomic::write_json_atomic(&self.paths.dispatcher_state(), &self.state)
    }

    /// Park `event` until `until_epoch_ms`, retaining its full body so it
    /// can be re-offered to triage once the backoff elapses (§4.6).
    pub fn defer_event(&mut self, event: Event, reason: impl Into<String>, until_epoch_ms: u64) {
        self.state.deferred_event_ids.insert(
            event.id.as_str().to_string(),
            crate::state::DeferredEvent {
                reason: reason.into(),
                deferred_until_epoch_ms: until_epoch_ms,
                event,
            },
        );
    }

    /// Events whose backoff has elapsed, removed from the deferred set and
    /// handed back to the caller for another pass through `onEvent`/triage.
    pub fn take_ready_deferred_events(&mut self, now_epoch_ms: u64) -> Vec<Event> {
        let ready_ids = self.state.ready_deferred_events(now_epoch_ms);
        ready_ids
            .into_iter()
            .filter_map(|id| self.state.deferred_event_ids.remove(&id).map(|d| d.event))
            .collect()
    }

    pub fn read_bridge_state(&self, bridge_name: &str) -> Result<crate::state::BridgeState, BusError> {
        atomic::read_json_or_default(&self.paths.bridge_state(bridge_name))
    }

    pub fn write_bridge_state(&self, bridge_name: &str, state: &crate::state::BridgeState) -> Result<(), BusError> {
        atomic::write_json_atomic(&self.paths.bridge_state(bridge_name), state)
    }

    pub fn read_bridge_receipts(&self, bridge_name: &str) -> Result<crate::state::BridgeReceipts, BusError> {
        atomic::read_json_or_default(&self.paths.bridge_receipts(bridge_name))
    }

    pub fn write_bridge_receipts(
        &self,
        bridge_name: &str,
        receipts: &crate::state::BridgeReceipts,
    ) -> Result<(), BusError> {
        atomic::write_json_atomic(&self.paths.bridge_receipts(bridge_name), receipts)
    }

    pub fn read_plugin_state(&self, plugin_name: &str) -> Result<crate::state::PluginState, BusError> {
        atomic::read_json_or_default(&self.paths.plugin_state(plugin_name))
    }

    pub fn write_plugin_state(&self, plugin_name: &str, state: &crate::state::PluginState) -> Result<(), BusError> {
        atomic::write_json_atomic(&self.paths.plugin_state(plugin_name), state)
    }
}

/// True if `root` already has a `dispatcher.json`, i.e. this bus has been
/// ticked at least once before (used on dispatcher restart to decide
/// whether to reconcile or start fresh).
pub fn bus_root_initialized(root: &Path) -> bool {
    BusPaths::new(root.to_path_buf()).dispatcher_state().exists()
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
