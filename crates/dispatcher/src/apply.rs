// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applying one drained control command (§4.1 step 2, command table) to
//! the in-memory [`DispatcherState`]. `activate` is the one command that
//! targets the inbox rather than a `PlanState` — a `draft`/`queued` plan
//! has no worktree yet (§3 invariant 3), so it has no entry in
//! `state.json` until ingestion runs.

use prloom_core::state_machine::legal_transition;
use prloom_core::{IdGen, PlanId, PlanStatus};

use crate::control::{ControlCommand, ControlCommandType};
use crate::inbox::InboxStore;
use crate::state_store::DispatcherState;
use crate::DispatcherError;

/// Apply one command, warning (not erroring) when it addresses a plan
/// this dispatcher doesn't know about — a stale/misdirected command
/// shouldn't abort the rest of the tick (§5: loop-level errors are
/// reserved for lock/state/IO failures).
pub fn apply_command<G: IdGen>(
    state: &mut DispatcherState,
    inbox: &InboxStore<G>,
    command: &ControlCommand,
    now_epoch_ms: u64,
) -> Result<(), DispatcherError> {
    let id = PlanId::new(command.plan_id.clone());

    if command.kind == ControlCommandType::Activate {
        return match inbox.activate(&id) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(plan_id = %id, error = %e, "activate command for unknown or unreadable inbox plan");
                Ok(())
            }
        };
    }

    let Some(ps) = state.plan_mut(&id) else {
        tracing::warn!(plan_id = %id, kind = ?command.kind, "control command for unknown plan");
        return Ok(());
    };

    match command.kind {
        ControlCommandType::Stop => {
            ps.blocked = true;
        }
        ControlCommandType::Unpause => {
            ps.blocked = false;
            ps.todo_retry_count = 0;
            // A plan parked in `paused` (manual-resume commit-review gate,
            // §4.3) has no other way back to `active` — `advance_one`
            // skips `paused` plans outright, so the status itself, not
            // just `blocked`, has to move here.
            if ps.status == PlanStatus::Paused && legal_transition(PlanStatus::Paused, PlanStatus::Active) {
                ps.transition_to(PlanStatus::Active, now_epoch_ms, Some("unpause command".to_string()));
            }
        }
        ControlCommandType::Poll => {
            ps.poll_once = true;
        }
        ControlCommandType::LaunchPoll => {
            ps.last_polled_at_epoch_ms = None;
        }
        ControlCommandType::Review => {
            if ps.status == PlanStatus::Review {
                ps.pending_review = true;
            } else {
                tracing::warn!(plan_id = %id, status = ?ps.status, "review command ignored: plan is not in review status");
            }
        }
        ControlCommandType::Activate => unreachable!("handled above"),
    }

    Ok(())
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
