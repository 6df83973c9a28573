// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `readEvents`/`appendEvent`/`appendAction` (§4.4), built on the byte-safe
//! primitives in [`crate::io`] and the envelope in [`crate::record`].

use prloom_core::{Action, Event};

use crate::io::{append_line, read_lines_from};
use crate::record::BusRecord;
use crate::BusError;
use std::path::Path;

/// Append one event to `path` (`events.jsonl`). A single `write` in append
/// mode (§4.4 write contract).
pub fn append_event(path: &Path, now_epoch_ms: u64, event: &Event) -> Result<(), BusError> {
    let record = BusRecord::event(now_epoch_ms, event);
    let line = serde_json::to_vec(&record)?;
    append_line(path, &line)
}

/// Append one action to `path` (`actions.jsonl`).
pub fn append_action(path: &Path, now_epoch_ms: u64, action: &Action) -> Result<(), BusError> {
    let record = BusRecord::action(now_epoch_ms, action);
    let line = serde_json::to_vec(&record)?;
    append_line(path, &line)
}

/// The read contract from §4.4: events new since `offset`, plus the offset
/// to resume from next time. Lines that fail to parse as an `Event` record
/// are logged and skipped rather than treated as corruption of the whole
/// file — only a genuinely partial trailing line (handled by
/// [`read_lines_from`]) is held back.
pub fn read_events(path: &Path, offset: u64) -> Result<(Vec<Event>, u64), BusError> {
    let (lines, new_offset) = read_lines_from(path, offset)?;
    let mut events = Vec::with_capacity(lines.len());
    for line in lines {
        match serde_json::from_slice::<BusRecord<Event>>(&line) {
            Ok(record) => events.push(record.data),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unparseable bus event line");
            }
        }
    }
    Ok((events, new_offset))
}

/// The action-log counterpart of [`read_events`].
pub fn read_actions(path: &Path, offset: u64) -> Result<(Vec<Action>, u64), BusError> {
    let (lines, new_offset) = read_lines_from(path, offset)?;
    let mut actions = Vec::with_capacity(lines.len());
    for line in lines {
        match serde_json::from_slice::<BusRecord<Action>>(&line) {
            Ok(record) => actions.push(record.data),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unparseable bus action line");
            }
        }
    }
    Ok((actions, new_offset))
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
