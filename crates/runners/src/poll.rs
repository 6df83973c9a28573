// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion polling for a detached runner (§4.3: "poll for completion
//! (tmux: wait for the session's exit-code sentinel file; pid: poll
//! `kill(pid,0)`; synchronous: already done)"). Grounded on the teacher's
//! `tmux has-session` shell-out for liveness checks
//! (`oj-adapters::session::tmux`) — this crate shells out the same way
//! rather than linking a process-inspection crate, since `unsafe_code` is
//! forbidden workspace-wide and a raw `kill(pid, 0)` syscall would require
//! it.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use prloom_core::RunnerHandle;
use tokio::process::Command;

/// Whether a detached runner identified by `handle` has finished.
#[async_trait]
pub trait CompletionWatcher: Send + Sync {
    async fn is_finished(&self, handle: &RunnerHandle, exitcode_path: &Path) -> bool;
}

/// Shells out to `tmux has-session` / `kill -0` to probe liveness, and
/// otherwise treats the presence of the exit-code sentinel file as
/// authoritative (§4.3, §4.1 "External scratch": `worker.exitcode`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessWatcher;

#[async_trait]
impl CompletionWatcher for ProcessWatcher {
    async fn is_finished(&self, handle: &RunnerHandle, exitcode_path: &Path) -> bool {
        if exitcode_path.exists() {
            return true;
        }
        match handle {
            RunnerHandle::Tmux { session } => !tmux_session_alive(session).await,
            RunnerHandle::Pid { pid } => !pid_alive(*pid).await,
        }
    }
}

async fn tmux_session_alive(session: &str) -> bool {
    match Command::new("tmux").arg("has-session").arg("-t").arg(session).output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

async fn pid_alive(pid: u32) -> bool {
    match Command::new("kill").arg("-0").arg(pid.to_string()).output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// How often [`crate::launch::run_agent_to_completion`] re-checks a
/// detached runner (§5: "poll period 1 s").
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
