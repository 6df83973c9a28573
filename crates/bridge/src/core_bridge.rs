// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The built-in `prloom-core` bridge (§4.5): outbound-only, registered
//! globally, handles `upsert_plan` actions by creating or updating an
//! inbox/active plan keyed on `{system, kind, id}` source identity.
//!
//! This bridge never talks to a real external system — it closes the loop
//! from a bus action straight back into this workspace's own plan store,
//! through the [`PlanRegistry`] seam the `prloom-dispatcher` crate
//! implements. That keeps this crate free of any dependency on the
//! dispatcher's inbox layout.

use std::sync::Arc;

use async_trait::async_trait;
use prloom_core::{ActionType, PlanId, PlanSourceIdentity};
use serde::{Deserialize, Serialize};

use crate::traits::{ActionResult, BridgeCtx, OutboundBridge};
use crate::BridgeError;

pub const CORE_BRIDGE_NAME: &str = "prloom-core";

/// The shape of an `upsert_plan` action's payload (§3 entity table, GLOSSARY
/// "Source identity").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPlanPayload {
    pub source: PlanSourceIdentity,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub todos: Vec<String>,
    /// When true, the plan lands in the inbox as `draft` rather than
    /// `queued` (§3 entity table: a designer agent may still be editing
    /// it).
    #[serde(default)]
    pub hidden: bool,
}

/// The seam the dispatcher implements so this bridge can find and create
/// plans without this crate knowing about the inbox's on-disk layout.
#[async_trait]
pub trait PlanRegistry: Send + Sync {
    async fn find_plan_by_source(&self, source: &PlanSourceIdentity) -> Result<Option<PlanId>, BridgeError>;

    /// Create a new inbox plan, or update an existing one's body/todos in
    /// place if `existing` is `Some`. Returns the plan id either way.
    async fn upsert_plan(
        &self,
        existing: Option<PlanId>,
        payload: UpsertPlanPayload,
    ) -> Result<PlanId, BridgeError>;
}

pub struct CoreBridge {
    registry: Arc<dyn PlanRegistry>,
}

impl CoreBridge {
    pub fn new(registry: Arc<dyn PlanRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OutboundBridge for CoreBridge {
    fn name(&self) -> &str {
        CORE_BRIDGE_NAME
    }

    async fn actions(
        &self,
        _ctx: &BridgeCtx,
        action: &prloom_core::Action,
    ) -> Result<ActionResult, BridgeError> {
        if action.kind != ActionType::UpsertPlan {
            // Routed here by mistake (e.g. a wildcard target) — nothing to
            // do, but don't claim a delivery receipt for a kind we never
            // handled.
            return Ok(ActionResult::failed("prloom-core only handles upsert_plan actions", false));
        }

        let payload: UpsertPlanPayload = serde_json::from_value(action.payload.clone())
            .map_err(|e| BridgeError::MalformedPayload(e.to_string()))?;

        let existing = self.registry.find_plan_by_source(&payload.source).await?;
        let plan_id = self.registry.upsert_plan(existing, payload).await?;

        Ok(ActionResult::delivered(Some(serde_json::json!({"planId": plan_id.as_str()}))))
    }
}

#[cfg(test)]
#[path = "core_bridge_tests.rs"]
mod tests;
