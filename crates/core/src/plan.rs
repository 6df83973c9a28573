// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan identifier and the TODO list a plan's markdown body carries.
//!
//! Markdown parsing/serialization is explicitly out of scope for this core
//! (§1 Non-goals) — the dispatcher consumes plans through the [`PlanDoc`]
//! trait (see [`crate::interfaces::plan_doc`]), which hands back a
//! [`PlanDocument`] value type. This module defines that value type and the
//! [`Todo`] records it carries, not the parser itself.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique, stable identifier for a plan (a short slug).
    ///
    /// All filesystem paths for a plan's worktree, bus, and scratch
    /// directories deterministically derive from this id (§3 invariant 1).
    pub struct PlanId;
}

/// A single TODO item in a plan's ordered list.
///
/// The `[b]`/`[B]` blocked marker is treated case-insensitively (§9 open
/// question): `blocked` is true for either case. This is a deliberate,
/// documented behavior, not an oversight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Position of this TODO in the plan's ordered list. Stable for the
    /// life of the plan: TODOs are appended, never reordered or removed.
    pub index: usize,
    pub text: String,
    pub done: bool,
    pub blocked: bool,
    /// Indented context lines that follow the TODO line, if any.
    pub context: Option<String>,
}

impl Todo {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            done: false,
            blocked: false,
            context: None,
        }
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    pub fn done(mut self) -> Self {
        self.done = true;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// The parsed form of a plan's markdown file: title, free-form body, and the
/// ordered TODO list. Produced and consumed only through [`PlanDoc`]
/// (`crate::interfaces::plan_doc`) — the core never parses markdown itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDocument {
    pub title: String,
    /// The plan body, excluding the TODO list itself (used to render CR
    /// descriptions).
    pub body: String,
    pub todos: Vec<Todo>,
}

impl PlanDocument {
    pub fn new(title: impl Into<String>, body: impl Into<String>, todos: Vec<Todo>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            todos,
        }
    }

    /// The first TODO that is not yet done, in index order.
    ///
    /// This is deliberately NOT filtered by `blocked`: the worker step
    /// (§4.3) needs to see a blocked TODO in order to halt the plan with a
    /// specific error, rather than silently skipping past it as if it were
    /// merely pending.
    pub fn find_next_unchecked(&self) -> Option<&Todo> {
        self.todos.iter().find(|t| !t.done)
    }

    /// True once every TODO is either done or blocked (§3 invariant 4: a
    /// plan reaching `done` status requires the CR non-draft AND all TODOs
    /// done-or-unreachable).
    pub fn all_todos_settled(&self) -> bool {
        self.todos.iter().all(|t| t.done || t.blocked)
    }

    pub fn has_todos(&self) -> bool {
        !self.todos.is_empty()
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
