// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::traits::{ActionResult, BridgeCtx, InboundPoll};
use crate::BridgeError;
use async_trait::async_trait;
use serde_json::Value;

struct NullInbound;
#[async_trait]
impl InboundBridge for NullInbound {
    fn name(&self) -> &str {
        "null-in"
    }
    async fn events(&self, _ctx: &BridgeCtx, state: Value) -> Result<InboundPoll, BridgeError> {
        Ok(InboundPoll { state, ..Default::default() })
    }
}

struct NullOutbound;
#[async_trait]
impl OutboundBridge for NullOutbound {
    fn name(&self) -> &str {
        "null-out"
    }
    async fn actions(&self, _ctx: &BridgeCtx, _action: &prloom_core::Action) -> Result<ActionResult, BridgeError> {
        Ok(ActionResult::delivered(None))
    }
}

#[test]
fn registers_inbound_and_outbound_independently() {
    let mut registry = BridgeRegistry::new();
    registry.register_inbound(Arc::new(NullInbound));
    registry.register_outbound(Arc::new(NullOutbound));

    assert_eq!(registry.inbound().len(), 1);
    assert_eq!(registry.outbound().len(), 1);
    assert_eq!(registry.inbound()[0].name(), "null-in");
    assert_eq!(registry.outbound()[0].name(), "null-out");
}

#[test]
fn empty_registry_has_no_bridges() {
    let registry = BridgeRegistry::new();
    assert!(registry.inbound().is_empty());
    assert!(registry.outbound().is_empty());
}
