// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prloom-bridge: the §4.5 Bridge Runtime. A bridge converts between the
//! bus (`prloom-bus`) and some external system — a hosting provider, a
//! chat tool, a calendar. No concrete bridge to a real external system
//! lives in this crate (§1 Non-goals); only the driver, the registry, and
//! the built-in `prloom-core` bridge that closes the loop back into this
//! workspace's own plan inbox.

pub mod core_bridge;
pub mod registry;
pub mod runtime;
pub mod traits;

pub use core_bridge::{CoreBridge, PlanRegistry, UpsertPlanPayload, CORE_BRIDGE_NAME};
pub use registry::BridgeRegistry;
pub use runtime::{BridgeRuntime, BridgeTickReport};
pub use traits::{ActionResult, BridgeCtx, InboundBridge, InboundPoll, OutboundBridge};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bus error: {0}")]
    Bus(#[from] prloom_bus::BusError),

    #[error("bridge poll failed: {0}")]
    PollFailed(String),

    #[error("action delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("malformed action payload: {0}")]
    MalformedPayload(String),

    #[error("plan registry error: {0}")]
    PlanRegistry(String),
}
