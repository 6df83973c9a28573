// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ReviewProvider`: the hosting-provider operations the dispatcher needs
//! against a plan's change request (§6). The `local` review provider
//! referenced by `review.provider` config (§6) is expected to be a fake or
//! a no-op implementation a caller supplies; only its shape is defined
//! here.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewProviderError {
    #[error("create draft failed: {0}")]
    CreateDraftFailed(String),
    #[error("update body failed: {0}")]
    UpdateBodyFailed(String),
    #[error("mark ready failed: {0}")]
    MarkReadyFailed(String),
    #[error("fetch feedback failed: {0}")]
    FetchFailed(String),
    #[error("post comment failed: {0}")]
    PostCommentFailed(String),
    #[error("submit review failed: {0}")]
    SubmitReviewFailed(String),
    #[error("no such CR: {0}")]
    NoSuchCr(String),
}

/// The lifecycle state of a CR as the hosting provider reports it (§4.1
/// step 3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrState {
    Draft,
    Open,
    Merged,
    Closed,
}

/// One top-level comment on a CR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub id: u64,
    pub author: String,
    pub body: String,
}

/// One inline (diff-anchored) review comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineReviewComment {
    pub id: u64,
    pub author: String,
    pub file: String,
    pub line: Option<u32>,
    pub body: String,
}

/// The three feedback categories fetched together each poll (§4.1 step 7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackBatch {
    pub comments: Vec<ReviewComment>,
    /// Review submissions (approve/request-changes/comment), identified by
    /// id so they can be cursor-filtered the same way comments are.
    pub reviews: Vec<ReviewComment>,
    pub inline_comments: Vec<InlineReviewComment>,
}

impl FeedbackBatch {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.reviews.is_empty() && self.inline_comments.is_empty()
    }

    pub fn max_comment_id(&self) -> u64 {
        self.comments.iter().map(|c| c.id).max().unwrap_or(0)
    }

    pub fn max_review_id(&self) -> u64 {
        self.reviews.iter().map(|r| r.id).max().unwrap_or(0)
    }

    pub fn max_inline_comment_id(&self) -> u64 {
        self.inline_comments.iter().map(|c| c.id).max().unwrap_or(0)
    }
}

/// An atomic review submission with inline comments (§4.3 "Review step").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub verdict: String,
    pub summary: String,
    pub inline_comments: Vec<InlineReviewComment>,
}

/// Hosting-provider operations the dispatcher needs (§6).
#[async_trait]
pub trait ReviewProvider: Send + Sync + 'static {
    /// Open a draft CR for `branch` with the given title/body, returning an
    /// opaque CR reference the caller stores on `PlanState::cr_reference`.
    async fn create_draft_cr(
        &self,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<String, ReviewProviderError>;

    async fn update_cr_body(&self, cr: &str, body: &str) -> Result<(), ReviewProviderError>;

    async fn mark_cr_ready(&self, cr: &str) -> Result<(), ReviewProviderError>;

    async fn get_cr_state(&self, cr: &str) -> Result<CrState, ReviewProviderError>;

    /// Fetch everything posted since the previous poll. The cursor
    /// filtering itself (§4.1 step 6/7) is the dispatcher's job, not the
    /// provider's — this returns whatever the provider currently has.
    async fn fetch_feedback(&self, cr: &str) -> Result<FeedbackBatch, ReviewProviderError>;

    async fn post_comment(&self, cr: &str, body: &str) -> Result<(), ReviewProviderError>;

    /// Submit a review atomically, with its inline comments, in one call
    /// (§4.3: "Submit atomically ... single review with inline comments").
    async fn submit_review(
        &self,
        cr: &str,
        submission: ReviewSubmission,
    ) -> Result<(), ReviewProviderError>;

    /// The login the provider should treat as "posted by us" when filtering
    /// feedback authored by the bot itself (§4.1 step 7).
    async fn bot_login(&self) -> Result<String, ReviewProviderError>;
}

#[cfg(test)]
#[path = "review_provider_tests.rs"]
mod tests;
