// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two bridge shapes (§4.5): inbound (polls an external source, emits
//! bus events) and outbound (delivers one bus action to an external
//! system). A single named bridge module may implement either or both.

use async_trait::async_trait;
use prloom_core::{Action, Event};
use serde_json::Value;

use crate::BridgeError;

/// Context handed to every bridge call. Deliberately thin: bridges get the
/// current time and nothing else from the runtime, keeping them free of any
/// dependency on dispatcher internals.
#[derive(Debug, Clone, Copy)]
pub struct BridgeCtx {
    pub now_epoch_ms: u64,
}

/// What an inbound bridge's poll produces (§4.5: `events(ctx, state) ->
/// {events, state, actions?}`).
#[derive(Debug, Clone, Default)]
pub struct InboundPoll {
    pub events: Vec<Event>,
    /// The bridge's own opaque state, returned verbatim for persistence —
    /// this is where a bridge like the GitHub one stashes its own
    /// last-poll timestamp so it can short-circuit internally (§4.5).
    pub state: Value,
    pub actions: Vec<Action>,
}

#[async_trait]
pub trait InboundBridge: Send + Sync {
    fn name(&self) -> &str;

    /// Poll the external source once. Implementations are expected to
    /// check their own last-poll timestamp inside `state` and return
    /// `state` unchanged with no events when their `pollIntervalMs` has
    /// not elapsed (§4.5) — the runtime calls this every tick regardless.
    async fn events(&self, ctx: &BridgeCtx, state: Value) -> Result<InboundPoll, BridgeError>;
}

/// The result of attempting to deliver one action (§4.5).
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub success: bool,
    pub receipt: Option<Value>,
    pub error: Option<String>,
    pub retryable: bool,
}

impl ActionResult {
    pub fn delivered(receipt: Option<Value>) -> Self {
        Self {
            success: true,
            receipt,
            error: None,
            retryable: false,
        }
    }

    pub fn failed(error: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            receipt: None,
            error: Some(error.into()),
            retryable,
        }
    }
}

#[async_trait]
pub trait OutboundBridge: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one action. The runtime has already checked the delivery
    /// receipt before calling this (§4.5) — an implementation never needs
    /// its own idempotency bookkeeping for the common case.
    async fn actions(&self, ctx: &BridgeCtx, action: &Action) -> Result<ActionResult, BridgeError>;
}
