// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The six control-log-producing subcommands (§6 "CLI surface") plus
//! `run`. Every subcommand except `run` is a single append to
//! `.prloom/control.jsonl` — the dispatcher loop (running elsewhere, or
//! started by a concurrent `run` invocation) picks the command up on its
//! next tick.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use prloom_bridge::BridgeRegistry;
use prloom_core::test_support::{FakeAgentAdapter, FakePlanDoc, FakeReviewProvider, FakeVcs};
use prloom_core::{Clock, SystemClock};
use prloom_dispatcher::{
    append_control_command, ControlCommand, ControlCommandType, DispatcherLoop, DispatcherLoopDeps,
    RepoLayout,
};
use prloom_hooks::HookRegistry;
use prloom_runners::ProcessWatcher;

use crate::config::load_config;
use crate::error::CliError;

fn append(layout: &RepoLayout, kind: ControlCommandType, plan_id: &str) -> Result<(), CliError> {
    let ts = SystemClock.epoch_ms();
    append_control_command(&layout.control_log(), &ControlCommand::new(kind, plan_id, ts))?;
    Ok(())
}

pub fn stop(repo_root: &Path, plan_id: &str) -> Result<(), CliError> {
    append(&RepoLayout::new(repo_root), ControlCommandType::Stop, plan_id)
}

pub fn unpause(repo_root: &Path, plan_id: &str) -> Result<(), CliError> {
    append(&RepoLayout::new(repo_root), ControlCommandType::Unpause, plan_id)
}

pub fn poll(repo_root: &Path, plan_id: &str) -> Result<(), CliError> {
    append(&RepoLayout::new(repo_root), ControlCommandType::Poll, plan_id)
}

pub fn launch_poll(repo_root: &Path, plan_id: &str) -> Result<(), CliError> {
    append(&RepoLayout::new(repo_root), ControlCommandType::LaunchPoll, plan_id)
}

pub fn review(repo_root: &Path, plan_id: &str) -> Result<(), CliError> {
    append(&RepoLayout::new(repo_root), ControlCommandType::Review, plan_id)
}

pub fn activate(repo_root: &Path, plan_id: &str) -> Result<(), CliError> {
    append(&RepoLayout::new(repo_root), ControlCommandType::Activate, plan_id)
}

/// Drive the dispatcher loop against `repo_root` until killed.
///
/// No concrete `VCS`/`ReviewProvider`/`AgentAdapter`/`PlanDoc` ships in this
/// workspace (§1 Non-goals), and bridge/hook modules are loaded dynamically
/// in a real deployment — a concern this thin CLI does not implement. Until
/// those are wired in from outside the workspace, `run` drives the loop
/// against the in-memory fakes so the state machine, bus, and control log
/// are still exercised end-to-end (see DESIGN.md).
pub async fn run(repo_root: &Path, _tmux: bool, _use_tui: bool) -> Result<(), CliError> {
    let layout = RepoLayout::new(repo_root);
    let config = load_config(&layout.config_json())?;

    let deps = DispatcherLoopDeps {
        layout: layout.clone(),
        clock: SystemClock,
        vcs: Arc::new(FakeVcs::new()),
        review_provider: Arc::new(FakeReviewProvider::new()),
        plan_doc: Arc::new(FakePlanDoc::new()),
        adapter: Arc::new(FakeAgentAdapter::new()),
        watcher: Arc::new(ProcessWatcher),
        hooks: HookRegistry::new(),
        global_bridges: BridgeRegistry::default(),
        config,
        agent_timeout: Duration::from_secs(60 * 30),
        scratch_root: std::env::temp_dir(),
        id_gen: prloom_core::UuidIdGen,
    };

    let mut dispatcher = DispatcherLoop::new(deps)?;
    tracing::info!(repo_root = %repo_root.display(), "dispatcher loop starting");
    dispatcher.run(prloom_dispatcher::DEFAULT_TICK_TIMEOUT).await?;
    Ok(())
}
