// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The envelope wrapping every JSONL line on the bus (§4.4): `{ts, kind,
//! schemaVersion, data}`.

use serde::{Deserialize, Serialize};

/// Current schema version stamped on every record this crate writes.
/// Readers do not reject other versions — they are carried through so a
/// future migration can inspect `schema_version` before deciding how to
/// interpret `data`.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Event,
    Action,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusRecord<T> {
    pub ts: u64,
    pub kind: RecordKind,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    pub data: T,
}

impl<T> BusRecord<T> {
    pub fn event(ts: u64, data: T) -> Self {
        Self {
            ts,
            kind: RecordKind::Event,
            schema_version: SCHEMA_VERSION,
            data,
        }
    }

    pub fn action(ts: u64, data: T) -> Self {
        Self {
            ts,
            kind: RecordKind::Action,
            schema_version: SCHEMA_VERSION,
            data,
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
