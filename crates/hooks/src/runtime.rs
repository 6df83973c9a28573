// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Hook`] and the per-point chain that runs registered hooks in
//! configured order (§4.6). A hook receives the plan markdown and a
//! [`PluginContext`](crate::context::PluginContext) and returns the
//! possibly-rewritten markdown; any error aborts the remainder of the
//! chain, which the caller (the dispatcher) turns into a blocked plan
//! (§7 "Hook error").

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::PluginContext;
use crate::point::HookPoint;
use crate::HookError;

#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, markdown: String, ctx: &mut PluginContext<'_>) -> Result<String, HookError>;
}

/// The ordered set of hooks registered for each lifecycle point (§4.6:
/// "Hooks of a given point run in configured order").
#[derive(Default)]
pub struct HookRegistry {
    by_point: HashMap<HookPoint, Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` at `point`, appended after any already registered —
    /// registration order is chain order.
    pub fn register(&mut self, point: HookPoint, hook: Arc<dyn Hook>) -> &mut Self {
        self.by_point.entry(point).or_default().push(hook);
        self
    }

    pub fn hooks_for(&self, point: HookPoint) -> &[Arc<dyn Hook>] {
        self.by_point.get(&point).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Runs every hook registered for one point, in order, threading the
/// markdown through each and accumulating the pending actions/event
/// decision left on `ctx` by the last hook that touched them.
pub struct HookChain;

impl HookChain {
    /// Run every hook registered for `point` in order. Stops at the first
    /// error (§4.6): the dispatcher's caller is expected to block the plan
    /// with `"Hook error: {name} failed: {reason}"`-shaped detail.
    pub async fn run(
        registry: &HookRegistry,
        point: HookPoint,
        mut markdown: String,
        ctx: &mut PluginContext<'_>,
    ) -> Result<String, HookError> {
        for hook in registry.hooks_for(point) {
            markdown = hook.run(markdown, ctx).await.map_err(|e| HookError::HookFailed {
                name: hook.name().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(markdown)
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
