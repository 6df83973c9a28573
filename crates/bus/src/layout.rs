// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk bus layout (§4.4, §6 "File layout"):
//!
//! ```text
//! <bus_root>/
//!   events.jsonl
//!   actions.jsonl
//!   state/
//!     dispatcher.json
//!     bridge.<name>.json
//!     bridge.<name>.actions.json
//!   plugin-state/<plugin>.json
//! ```
//!
//! A bus root is either `<worktree>/prloom/.local/bus/` (per-plan) or
//! `<repoRoot>/prloom/.local/bus/` (global) — this type doesn't care which,
//! it just resolves paths relative to whatever root it's given.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BusPaths {
    root: PathBuf,
}

impl BusPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events_log(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    pub fn actions_log(&self) -> PathBuf {
        self.root.join("actions.jsonl")
    }

    pub fn dispatcher_state(&self) -> PathBuf {
        self.root.join("state").join("dispatcher.json")
    }

    pub fn bridge_state(&self, bridge_name: &str) -> PathBuf {
        self.root.join("state").join(format!("bridge.{bridge_name}.json"))
    }

    pub fn bridge_receipts(&self, bridge_name: &str) -> PathBuf {
        self.root
            .join("state")
            .join(format!("bridge.{bridge_name}.actions.json"))
    }

    pub fn plugin_state(&self, plugin_name: &str) -> PathBuf {
        self.root.join("plugin-state").join(format!("{plugin_name}.json"))
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
