// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level error taxonomy for the dispatcher binary and loop. Per-plan
//! failures (§7) are caught at the per-plan boundary in [`crate::advance`]
//! and turned into `PlanState::last_error` rather than surfacing here —
//! these variants are for failures of the loop itself: lock acquisition,
//! state persistence, control-log IO.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("failed to acquire repo lock at {0}: {1}")]
    LockFailed(std::path::PathBuf, std::io::Error),

    #[error("bus error: {0}")]
    Bus(#[from] prloom_bus::BusError),

    #[error("bridge error: {0}")]
    Bridge(#[from] prloom_bridge::BridgeError),

    #[error("hook error: {0}")]
    Hook(#[from] prloom_hooks::HookError),

    #[error("runner error: {0}")]
    Runner(#[from] prloom_runners::RunnerError),

    #[error("vcs error: {0}")]
    Vcs(#[from] prloom_core::interfaces::VcsError),

    #[error("review provider error: {0}")]
    ReviewProvider(#[from] prloom_core::interfaces::ReviewProviderError),

    #[error("plan doc error: {0}")]
    PlanDoc(#[from] prloom_core::interfaces::PlanDocError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
