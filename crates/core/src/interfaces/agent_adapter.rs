// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AgentAdapter`: the single seam through which the dispatcher launches a
//! worker/triage/review sub-agent (§6). Vendor-specific argv assembly for
//! any particular agent CLI is explicitly out of scope (§1) — this crate
//! only defines the shape of the request/response.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
}

/// What the dispatcher asks an agent to do (§4.3: worker/triage/review
/// prompts are all rendered the same way and launched through this one
/// seam, differing only in `stage` and `prompt`).
#[derive(Debug, Clone)]
pub struct AgentExecuteRequest {
    pub cwd: PathBuf,
    pub prompt: String,
    pub model: Option<String>,
    /// Run the agent inside a tmux session rather than as a bare detached
    /// process (§6: `{tmux?: bool}`).
    pub tmux: bool,
    /// Which stage this invocation is for (`worker`, `triage`, `commitReview`,
    /// `designer`, …) — used by the caller to resolve `agents.<name>.<stage>`
    /// config (§6), not interpreted by the adapter itself.
    pub stage: String,
}

/// What an adapter hands back immediately after launching (§6: "must be
/// fire-and-observe, never blocking the loop for more than the decision to
/// spawn"). Exactly one of the three fields is meaningful, depending on how
/// the adapter chose to run the agent.
#[derive(Debug, Clone, Default)]
pub struct AgentExecuteResult {
    pub pid: Option<u32>,
    pub tmux_session: Option<String>,
    /// Set only when the adapter ran the agent to completion synchronously
    /// before returning (rare; most adapters detach).
    pub exit_code: Option<i32>,
}

impl AgentExecuteResult {
    pub fn detached_pid(pid: u32) -> Self {
        Self {
            pid: Some(pid),
            ..Default::default()
        }
    }

    pub fn detached_tmux(session: impl Into<String>) -> Self {
        Self {
            tmux_session: Some(session.into()),
            ..Default::default()
        }
    }

    pub fn synchronous(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Default::default()
        }
    }

    /// Whether the dispatcher must poll for completion rather than treat
    /// this call as already finished.
    pub fn is_detached(&self) -> bool {
        self.exit_code.is_none()
    }
}

#[async_trait]
pub trait AgentAdapter: Send + Sync + 'static {
    async fn execute(
        &self,
        request: AgentExecuteRequest,
    ) -> Result<AgentExecuteResult, AgentAdapterError>;
}

#[cfg(test)]
#[path = "agent_adapter_tests.rs"]
mod tests;
