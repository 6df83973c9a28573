// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-stable `Event`/`Action` records (§6) carried on the bus. These are
//! serialized verbatim into JSONL lines by `prloom-bus`; this crate owns the
//! shape, not the framing (`{ts, kind, schemaVersion, data}`) around it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Identity of one bus event, unique within its bus file.
    pub struct EventId;
}

crate::define_id! {
    /// Identity of one bus action, unique within its bus file.
    pub struct ActionId;
}

/// How urgently an event should be surfaced to a human (§3 entity table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Where a reply to an event should be routed, and the opaque token the
/// originating bridge needs to address it (e.g. a PR review-comment id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
    pub target: String,
    pub token: String,
}

/// An inbound (bridge-authored) or internally-authored (lifecycle) record
/// on the bus. Never mutated after being appended (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Tag identifying the producer (bridge name, or `"core"` for
    /// lifecycle events).
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, Value>>,
}

/// The canonical action kinds (§6). `Other` carries through anything a
/// hook/plugin emits that isn't one of the four canonical kinds — the
/// bridge runtime dispatches on this tag, falling back to a bridge-specific
/// handler for `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Comment,
    Review,
    Merge,
    UpsertPlan,
    #[serde(other)]
    Other,
}

/// The `{system, kind, id}` uniqueness key the core bridge uses to find an
/// existing plan for an `upsert_plan` action (§4.5, GLOSSARY "Source
/// identity").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanSourceIdentity {
    pub system: String,
    pub kind: String,
    pub id: String,
}

/// An outbound record appended by hooks/triage and delivered at most once
/// per bridge (§3 invariant 5). `payload` is left as a free-form JSON value
/// — callers building a canonical `comment`/`review`/`merge`/`upsert_plan`
/// action should shape it through the helpers in `prloom-bridge`, which
/// know each kind's expected fields; the core itself only routes on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub kind: ActionType,
    /// Bridge name this action should be routed to, or a wildcard the
    /// runtime resolves against `bridges`/`globalBridges` config.
    pub target: String,
    pub payload: Value,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
