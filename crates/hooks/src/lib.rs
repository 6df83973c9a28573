// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prloom-hooks: the §4.6 Hook/Plugin Runtime. A closed set of lifecycle
//! extension points at which user plugins observe or rewrite a plan's
//! markdown; a scoped key/value store; and the `onEvent` path that lets a
//! plugin intercept bus events before they reach triage. Dynamic module
//! loading is out of scope here (§9 "Design notes": compile-time registry
//! of trait objects is the chosen translation) — this crate only defines
//! the [`Hook`] trait and the runtime that chains hooks together.

pub mod context;
pub mod point;
pub mod runtime;

pub use context::{EventDecision, HookAgentRunner, PluginContext, ReadEventsQuery, RunAgentOptions};
pub use point::HookPoint;
pub use runtime::{Hook, HookChain, HookRegistry};

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("bus error: {0}")]
    Bus(#[from] prloom_bus::BusError),

    #[error("agent run failed: {0}")]
    AgentRunFailed(String),

    #[error("hook '{name}' failed: {reason}")]
    HookFailed { name: String, reason: String },
}
