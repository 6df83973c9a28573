// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PlanDoc`: the markdown read/write seam (§6). Markdown parsing and
//! serialization are explicitly out of scope for this core (§1) — callers
//! supply an implementation; the dispatcher only ever sees the
//! [`PlanDocument`](crate::plan::PlanDocument) value type this trait
//! produces and consumes.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::plan::PlanDocument;

#[derive(Debug, Error)]
pub enum PlanDocError {
    #[error("plan file not found: {0}")]
    NotFound(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("write error: {0}")]
    WriteError(String),
}

/// The trivial `extract_body` most implementations delegate to: the body
/// already excludes the TODO list by construction of [`PlanDocument`].
/// Exposed as a free function so `PlanDoc` implementors aren't forced to
/// duplicate it.
pub fn plain_body(doc: &PlanDocument) -> String {
    doc.body.clone()
}

#[async_trait]
pub trait PlanDoc: Send + Sync + 'static {
    /// Parse the plan markdown at `path` into a [`PlanDocument`].
    async fn parse(&self, path: &Path) -> Result<PlanDocument, PlanDocError>;

    /// Write a brand-new plan file at `path` (§4.5: the `prloom-core`
    /// bridge materializes an inbox plan from an `upsert_plan` action's
    /// title/body/todos when no existing plan matches the source
    /// identity). Overwrites whatever is already at `path`, if anything.
    async fn create(&self, path: &Path, doc: &PlanDocument) -> Result<(), PlanDocError>;

    /// The plan body with the TODO list section removed (used to render CR
    /// descriptions, §4.3 "Worker step").
    fn extract_body(&self, doc: &PlanDocument) -> String;

    /// The first unchecked TODO, not filtering on `blocked` (mirrors
    /// [`PlanDocument::find_next_unchecked`]; exists on the trait so callers
    /// that only have a path, not a parsed document, can ask for it
    /// directly).
    async fn find_next_unchecked(&self, path: &Path) -> Result<Option<usize>, PlanDocError>;

    /// Append new TODO lines to the plan file (§4.6: hooks may append
    /// TODOs; §4.3: triage may stage plan edits).
    async fn add_todos(&self, path: &Path, texts: &[String]) -> Result<(), PlanDocError>;

    /// Append a line to the plan's progress log section.
    async fn append_progress_log(&self, path: &Path, text: &str) -> Result<(), PlanDocError>;

    /// Mark the TODO at `index` done (worker) or clear it (commit-review
    /// rejection, or a human editing the CR).
    async fn set_todo_done(&self, path: &Path, index: usize, done: bool) -> Result<(), PlanDocError>;
}

#[cfg(test)]
#[path = "plan_doc_tests.rs"]
mod tests;
