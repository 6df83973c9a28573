// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prloom-bus: the JSONL event/action log and the small bit of on-disk
//! state (offsets, dedup sets, bridge/plugin state) that reads and writes
//! it. No scheduling policy lives here (§1 Non-goals) — this crate only
//! knows how to append, read, and persist, the way the dispatcher, bridge
//! runtime, and hook runtime all need to.

pub mod atomic;
pub mod dedup;
pub mod io;
pub mod layout;
pub mod log;
pub mod manager;
pub mod record;
pub mod state;

pub use atomic::{read_json_or_default, write_json_atomic};
pub use dedup::{deduplicate_events, ProcessedIds, DEFAULT_PROCESSED_IDS_CAP};
pub use layout::BusPaths;
pub use log::{append_action, append_event, read_actions, read_events};
pub use manager::BusManager;
pub use record::{BusRecord, RecordKind, SCHEMA_VERSION};
pub use state::{BridgeReceipts, BridgeState, DeferredEvent, DispatcherBusState, PluginState};

/// Errors from reading, writing, or parsing the bus's on-disk files.
///
/// A malformed individual log line is not an error (the reader skips and
/// warns, §4.4) — these variants cover failures of the files themselves.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bus json error: {0}")]
    Json(#[from] serde_json::Error),
}
