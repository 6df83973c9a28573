// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt rendering for the three stages (§4.3). Prompt *template*
//! assembly (vendor-specific phrasing, few-shot scaffolding, …) is out of
//! scope (§1) — these functions produce the plain-text content the
//! dispatcher actually hands an adapter, following the shape of the
//! teacher's `NotifyConfig::render`-style plain string building rather than
//! any templating engine.

use prloom_core::interfaces::FeedbackBatch;
use prloom_core::{PlanDocument, Todo};

/// The worker prompt for the next unchecked TODO (§4.3 "Worker step").
pub fn render_worker_prompt(plan: &PlanDocument, todo: &Todo) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", plan.title));
    if !plan.body.is_empty() {
        out.push_str(&plan.body);
        out.push_str("\n\n");
    }
    out.push_str(&format!("## Current task (#{})\n\n{}\n", todo.index, todo.text));
    if let Some(context) = &todo.context {
        out.push('\n');
        out.push_str(context);
        out.push('\n');
    }
    out.push_str("\nImplement this task, then mark it done in the plan.\n");
    out
}

/// The triage prompt: the plan plus whatever new feedback items arrived
/// (§4.3 "Triage step").
pub fn render_triage_prompt(plan: &PlanDocument, feedback: &FeedbackBatch) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", plan.title));
    if !plan.body.is_empty() {
        out.push_str(&plan.body);
        out.push_str("\n\n");
    }
    out.push_str("## New feedback\n\n");
    for comment in &feedback.comments {
        out.push_str(&format!("- comment by {}: {}\n", comment.author, comment.body));
    }
    for review in &feedback.reviews {
        out.push_str(&format!("- review by {}: {}\n", review.author, review.body));
    }
    for inline in &feedback.inline_comments {
        out.push_str(&format!(
            "- inline comment by {} on {}{}: {}\n",
            inline.author,
            inline.file,
            inline.line.map(|l| format!(":{l}")).unwrap_or_default(),
            inline.body
        ));
    }
    out.push_str(
        "\nDecide whether this requires a rebase, a reply, or plan edits. Write your decision to triage-result.json.\n",
    );
    out
}

/// The review prompt: inspect the CR diff and write a verdict (§4.3
/// "Review step"). The diff itself is fetched by the caller and handed in
/// as plain text, not re-derived here.
pub fn render_review_prompt(plan: &PlanDocument, diff: &str) -> String {
    format!(
        "# Review: {}\n\nInspect the following diff and write your verdict to review-result.json \
         as {{verdict, summary, comments[]}}.\n\n```diff\n{diff}\n```\n",
        plan.title
    )
}

/// The commit-review gate's prompt: inspect the last commit for the
/// current TODO (§4.3: "a reviewer sub-agent; if it un-checks the TODO").
pub fn render_commit_review_prompt(todo: &Todo, diff: &str) -> String {
    format!(
        "# Commit review: task #{}\n\n{}\n\nInspect the following diff. If it does not \
         satisfactorily complete the task, reject it. Write your verdict to \
         commit-review-result.json as {{verdict: \"approve\"|\"reject\", reason}}.\n\n```diff\n{diff}\n```\n",
        todo.index, todo.text
    )
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
