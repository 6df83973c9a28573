// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The set of bridges wired up for one bus root (per-worktree `bridges` or
//! repo-global `globalBridges`, §6). A bridge may be inbound-only,
//! outbound-only, or both — the built-in `prloom-core` bridge (§4.5) is
//! outbound-only.

use std::sync::Arc;

use crate::traits::{InboundBridge, OutboundBridge};

#[derive(Default)]
pub struct BridgeRegistry {
    inbound: Vec<Arc<dyn InboundBridge>>,
    outbound: Vec<Arc<dyn OutboundBridge>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_inbound(&mut self, bridge: Arc<dyn InboundBridge>) -> &mut Self {
        self.inbound.push(bridge);
        self
    }

    pub fn register_outbound(&mut self, bridge: Arc<dyn OutboundBridge>) -> &mut Self {
        self.outbound.push(bridge);
        self
    }

    pub fn inbound(&self) -> &[Arc<dyn InboundBridge>] {
        &self.inbound
    }

    pub fn outbound(&self) -> &[Arc<dyn OutboundBridge>] {
        &self.outbound
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
