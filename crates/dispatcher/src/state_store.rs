// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `state.json` (§6): `{ control_cursor, plans }`, rewritten atomically at
//! the end of every tick (§5 "Shared-resource policy"). §6 also requires
//! "unknown keys are preserved on rewrite" — handled here with a flattened
//! catch-all map so a newer dispatcher's extra fields survive a round trip
//! through an older one, the same way the teacher's checkpoint format
//! tolerates schema drift.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use prloom_bus::atomic::{read_json_or_default, write_json_atomic};
use prloom_core::plan_state::{PlanState, PlanStatus};
use prloom_core::PlanId;

use crate::DispatcherError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherState {
    pub control_cursor: u64,
    pub plans: HashMap<String, PlanState>,

    #[serde(flatten)]
    pub unknown: serde_json::Map<String, serde_json::Value>,
}

impl DispatcherState {
    pub fn load(path: &Path) -> Result<Self, DispatcherError> {
        read_json_or_default(path).map_err(DispatcherError::from)
    }

    pub fn persist(&self, path: &Path) -> Result<(), DispatcherError> {
        write_json_atomic(path, self).map_err(DispatcherError::from)
    }

    pub fn plan(&self, id: &PlanId) -> Option<&PlanState> {
        self.plans.get(id.as_str())
    }

    pub fn plan_mut(&mut self, id: &PlanId) -> Option<&mut PlanState> {
        self.plans.get_mut(id.as_str())
    }

    pub fn insert_plan(&mut self, id: &PlanId, state: PlanState) {
        self.plans.insert(id.as_str().to_string(), state);
    }

    pub fn remove_plan(&mut self, id: &PlanId) -> Option<PlanState> {
        self.plans.remove(id.as_str())
    }
}

/// §4.1 step 1: union on-disk state into `memory`, preferring the
/// in-memory copy's transient fields (retry counter, runner handle) and
/// only lifting `status` from disk when doing so is a legal forward
/// transition. A disk entry with no in-memory counterpart is adopted
/// as-is (another dispatcher process, or our own previous run, created
/// it); an in-memory entry with no disk counterpart is left alone — it
/// will be written back out at the end of this tick.
pub fn merge_external_state(memory: &mut DispatcherState, disk: DispatcherState) {
    memory.control_cursor = memory.control_cursor.max(disk.control_cursor);

    for (id, disk_plan) in disk.plans {
        match memory.plans.get_mut(&id) {
            Some(mem_plan) => merge_plan(mem_plan, disk_plan),
            None => {
                memory.plans.insert(id, disk_plan);
            }
        }
    }
}

fn merge_plan(mem_plan: &mut PlanState, disk_plan: PlanState) {
    if disk_plan.status != mem_plan.status
        && prloom_core::state_machine::legal_transition(mem_plan.status, disk_plan.status)
    {
        mem_plan.status = disk_plan.status;
    }
}

/// Read-only helper for a plan's status, defaulting to [`PlanStatus::Draft`]
/// when the plan is not (yet) known — used by callers that want to log
/// without first unwrapping an `Option`.
pub fn status_of(state: &DispatcherState, id: &PlanId) -> PlanStatus {
    state.plan(id).map(|p| p.status).unwrap_or(PlanStatus::Draft)
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
