// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resolved configuration struct (§6). Parsing `prloom/config.json`
//! (merging defaults, presets, and plan-level overrides) is explicitly out
//! of scope for this core (§1) — callers hand the dispatcher an already
//! resolved [`Config`].

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-stage agent overrides (§6: `agents.<name>.{default|designer|worker|
/// triage|commitReview}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStageOverrides {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub designer: Option<String>,
    #[serde(default)]
    pub worker: Option<String>,
    #[serde(default)]
    pub triage: Option<String>,
    #[serde(rename = "commitReview", default)]
    pub commit_review: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub default: String,
    #[serde(flatten)]
    pub by_name: HashMap<String, AgentStageOverrides>,
}

/// `bridges.<name>` / `globalBridges.<name>` entry (§4.5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub enabled: bool,
    #[serde(default, rename = "pollIntervalMs")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// `plugins.<name>` / `globalPlugins.<name>` entry (§4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub enabled: bool,
    pub module: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// `review.provider` (§6): gates whether the built-in hosting-provider
/// bridge is registered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewProviderKind {
    Local,
    Github,
    Custom,
}

impl Default for ReviewProviderKind {
    fn default() -> Self {
        ReviewProviderKind::Local
    }
}

/// `commitReview.{…}` (§4.3, §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitReviewConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "maxLoops")]
    pub max_loops: u32,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "requireManualResume")]
    pub require_manual_resume: bool,
}

/// Supplemented loop-guard config (§9 open question on `beforeFinish`
/// termination): a plan that revisits the same hook point more than this
/// many times is blocked instead of looping forever. `None` disables the
/// guard, matching the source's undocumented-but-observed unbounded
/// behavior.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoopGuardConfig {
    #[serde(default, rename = "maxHookVisits")]
    pub max_hook_visits: Option<u32>,
}

/// The fully-resolved configuration the dispatcher loop runs with (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agents: AgentsConfig,

    #[serde(rename = "base_branch")]
    pub base_branch: String,

    #[serde(rename = "worktrees_dir")]
    pub worktrees_dir: PathBuf,

    #[serde(rename = "github_poll_interval_ms", default = "default_poll_interval_ms")]
    pub github_poll_interval_ms: u64,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub bridges: HashMap<String, BridgeConfig>,
    #[serde(default, rename = "globalBridges")]
    pub global_bridges: HashMap<String, BridgeConfig>,

    #[serde(default)]
    pub plugins: HashMap<String, PluginConfig>,
    #[serde(default, rename = "globalPlugins")]
    pub global_plugins: HashMap<String, PluginConfig>,

    #[serde(default, rename = "copyFiles")]
    pub copy_files: Vec<String>,
    #[serde(default, rename = "initCommands")]
    pub init_commands: Vec<String>,

    #[serde(default)]
    pub presets: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default, rename = "commitReview")]
    pub commit_review: CommitReviewConfig,

    #[serde(default, rename = "loopGuard")]
    pub loop_guard: LoopGuardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_tick_interval_ms", rename = "tickIntervalMs")]
    pub tick_interval_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_bus_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub provider: ReviewProviderKind,
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_bus_tick_interval_ms() -> u64 {
    5_000
}

impl Config {
    /// Resolve the adapter name for `stage`, falling back through
    /// `agents.<name>.<stage>` → `agents.<name>.default` → `agents.default`
    /// (§6).
    pub fn resolve_agent<'a>(&'a self, agent_name: &str, stage: &str) -> &'a str {
        if let Some(overrides) = self.agents.by_name.get(agent_name) {
            let by_stage = match stage {
                "designer" => overrides.designer.as_deref(),
                "worker" => overrides.worker.as_deref(),
                "triage" => overrides.triage.as_deref(),
                "commitReview" => overrides.commit_review.as_deref(),
                _ => None,
            };
            if let Some(resolved) = by_stage {
                return resolved;
            }
            if let Some(default) = overrides.default.as_deref() {
                return default;
            }
        }
        &self.agents.default
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
