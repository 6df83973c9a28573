// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox ingestion (§4.1 step 3): turns a queued inbox plan into an active,
//! worktree-backed one with an open draft CR.

use std::sync::Arc;

use prloom_core::interfaces::{PlanDoc, ReviewProvider, Vcs};
use prloom_core::{PlanId, PlanState, PlanStatus};

use crate::inbox::InboxMeta;
use crate::layout::RepoLayout;
use crate::DispatcherError;

/// What §4.1 step 3 needs besides the layout and inbox entry: the base
/// branch new worktrees are cut from, and the three collaborators doing
/// the actual work. Bundled so `ingest_one`'s signature stays readable.
pub struct IngestDeps<'a> {
    pub layout: &'a RepoLayout,
    pub vcs: &'a Arc<dyn Vcs>,
    pub review_provider: &'a Arc<dyn ReviewProvider>,
    pub plan_doc: &'a Arc<dyn PlanDoc>,
    pub base_branch: &'a str,
}

/// One ingested plan, ready to be inserted into [`crate::state_store::DispatcherState`].
pub struct IngestedPlan {
    pub id: PlanId,
    pub state: PlanState,
}

/// Ingest exactly one queued inbox plan (§4.1 step 3). Returns `Ok(None)`
/// for a plan with zero TODOs — those are skipped and logged, not blocked,
/// per §4.1: "to avoid an immediate 'done' loop".
pub async fn ingest_one(
    deps: &IngestDeps<'_>,
    id: &PlanId,
    meta: &InboxMeta,
) -> Result<Option<IngestedPlan>, DispatcherError> {
    let md_path = deps.layout.inbox_plan_md(id);
    let doc = deps.plan_doc.parse(&md_path).await?;

    if !doc.has_todos() {
        tracing::warn!(plan_id = %id, "skipping inbox plan with zero TODOs");
        return Ok(None);
    }

    let desired_branch = format!("prloom/{}", id.as_str());
    let branch = deps.vcs.create_branch(deps.base_branch, &desired_branch).await?;

    let worktree_path = deps.layout.worktree_dir(id);
    deps.vcs.create_worktree(&branch, &worktree_path).await?;

    let worktree_plan_path = deps.layout.worktree_plan_md(id);
    deps.plan_doc.create(&worktree_plan_path, &doc).await?;

    deps.vcs
        .commit_empty(&worktree_path, &format!("[prloom] {}: seed", id.as_str()))
        .await?;
    deps.vcs.push(&worktree_path, &branch).await?;

    let cr_body = deps.plan_doc.extract_body(&doc);
    let cr_reference = deps
        .review_provider
        .create_draft_cr(&branch, &doc.title, &cr_body)
        .await?;

    let mut state = PlanState::new_draft();
    state.status = PlanStatus::Active;
    state.worktree_path = Some(worktree_path);
    state.branch = Some(branch);
    state.base_branch = Some(deps.base_branch.to_string());
    state.cr_reference = Some(cr_reference);
    state.agent_override = meta.agent.clone();

    Ok(Some(IngestedPlan { id: id.clone(), state }))
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
