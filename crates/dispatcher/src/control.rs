// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control log (§6): `<repoRoot>/.prloom/control.jsonl`, one `{type,
//! plan_id, ts}` record per line, read from a byte-offset cursor the same
//! way the bus is (§4.1 step 2, §5 "Ordering guarantees": commands are
//! applied in append order).

use serde::{Deserialize, Serialize};
use std::path::Path;

use prloom_bus::io::{append_line, read_lines_from};
use prloom_core::PlanId;

use crate::DispatcherError;

/// The six control commands the CLI surface produces (§4.1 command table,
/// §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommandType {
    Stop,
    Unpause,
    Poll,
    LaunchPoll,
    Review,
    Activate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    #[serde(rename = "type")]
    pub kind: ControlCommandType,
    pub plan_id: String,
    pub ts: u64,
}

impl ControlCommand {
    pub fn new(kind: ControlCommandType, plan_id: impl Into<String>, ts: u64) -> Self {
        Self { kind, plan_id: plan_id.into(), ts }
    }
}

/// Append one control command to `path` (§4.4 write contract applies here
/// too: a single append-mode write, no in-place edits). This is the
/// function the CLI's subcommands call.
pub fn append_control_command(path: &Path, command: &ControlCommand) -> Result<(), DispatcherError> {
    let line = serde_json::to_vec(command)?;
    append_line(path, &line).map_err(DispatcherError::from)
}

/// Read every complete control command since `offset` (§4.1 step 2). Lines
/// that fail to parse are logged and skipped, mirroring the bus's
/// tolerance for unparseable individual records — only a genuinely partial
/// trailing line is held back for the next read.
pub fn read_control_commands(path: &Path, offset: u64) -> Result<(Vec<ControlCommand>, u64), DispatcherError> {
    let (lines, new_offset) = read_lines_from(path, offset)?;
    let mut commands = Vec::with_capacity(lines.len());
    for line in lines {
        match serde_json::from_slice::<ControlCommand>(&line) {
            Ok(command) => commands.push(command),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unparseable control log line");
            }
        }
    }
    Ok((commands, new_offset))
}

pub fn plan_id_of(command: &ControlCommand) -> PlanId {
    PlanId::new(command.plan_id.clone())
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
