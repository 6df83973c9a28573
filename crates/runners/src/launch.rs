// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared launch-then-await-completion sequence every stage (worker,
//! triage, review) goes through (§4.3): resolve the adapter, launch it,
//! remember the transient [`RunnerHandle`](prloom_core::RunnerHandle) for
//! the duration of the call, poll until finished, then forget it (§3
//! invariant 2: at most one subprocess per plan at any instant, so the
//! handle only needs to live on the stack here, not in `PlanState`, between
//! launch and join).

use std::path::Path;
use std::time::Duration;

use prloom_core::interfaces::{AgentAdapter, AgentExecuteRequest};
use prloom_core::RunnerHandle;

use crate::poll::{CompletionWatcher, DEFAULT_POLL_PERIOD};
use crate::RunnerError;

/// What actually happened once a detached or synchronous agent run
/// finished.
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    /// Set when the adapter ran synchronously; `None` for detached runs,
    /// where exit status is only ever observable via the exitcode sentinel
    /// (§4.1 "External scratch") and is not otherwise surfaced to callers.
    pub exit_code: Option<i32>,
}

/// Launch `request` via `adapter`, wait for it to finish per `watcher`
/// (polling every `poll_period`, timing out after `timeout`), and return.
///
/// `exitcode_path` is the sentinel file a detached run's wrapper script is
/// expected to write to on completion (§4.1, §5).
pub async fn run_agent_to_completion(
    adapter: &dyn AgentAdapter,
    watcher: &dyn CompletionWatcher,
    request: AgentExecuteRequest,
    exitcode_path: &Path,
    poll_period: Duration,
    timeout: Duration,
) -> Result<AgentOutcome, RunnerError> {
    let result = adapter.execute(request).await?;

    if let Some(exit_code) = result.exit_code {
        return Ok(AgentOutcome { exit_code: Some(exit_code) });
    }

    let handle = if let Some(session) = result.tmux_session {
        RunnerHandle::Tmux { session }
    } else if let Some(pid) = result.pid {
        RunnerHandle::Pid { pid }
    } else {
        // No handle and no synchronous exit code: nothing to poll, treat as
        // already done rather than spinning forever.
        return Ok(AgentOutcome::default());
    };

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if watcher.is_finished(&handle, exitcode_path).await {
            return Ok(AgentOutcome::default());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(RunnerError::CompletionTimeout(timeout));
        }
        tokio::time::sleep(poll_period).await;
    }
}

/// Convenience wrapper using [`DEFAULT_POLL_PERIOD`].
pub async fn run_agent_to_completion_default(
    adapter: &dyn AgentAdapter,
    watcher: &dyn CompletionWatcher,
    request: AgentExecuteRequest,
    exitcode_path: &Path,
    timeout: Duration,
) -> Result<AgentOutcome, RunnerError> {
    run_agent_to_completion(adapter, watcher, request, exitcode_path, DEFAULT_POLL_PERIOD, timeout).await
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
