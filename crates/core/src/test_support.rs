// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC
#![cfg_attr(coverage_nightly, coverage(off))]

//! In-memory fakes for the four collaborator traits in
//! [`crate::interfaces`], gated behind the `test-support` feature.
//! `prloom-dispatcher`/`prloom-runners`/`prloom-bridge` use these to
//! exercise the dispatcher end-to-end without a real `git`, hosting
//! provider, or agent CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::interfaces::{
    AgentAdapter, AgentAdapterError, AgentExecuteRequest, AgentExecuteResult, CrState,
    FeedbackBatch, PlanDoc, PlanDocError, RebaseOutcome, ReviewProvider, ReviewProviderError,
    ReviewSubmission, Vcs, VcsError,
};
use crate::plan::PlanDocument;

/// One recorded call against a fake `Vcs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    CreateBranch { base: String, desired: String },
    CreateWorktree { branch: String, path: PathBuf },
    CommitAll { worktree: PathBuf, message: String },
    CommitEmpty { worktree: PathBuf, message: String },
    Push { worktree: PathBuf, branch: String },
    ForcePush { worktree: PathBuf, branch: String },
    RebaseOnBase { worktree: PathBuf, branch: String, base_branch: String },
}

struct FakeVcsState {
    calls: Vec<VcsCall>,
    branches: HashMap<String, String>,
    rebase_outcome: RebaseOutcome,
    next_commit: u64,
}

/// A `Vcs` fake that records every call and always succeeds unless told
/// otherwise via [`FakeVcs::set_rebase_outcome`].
#[derive(Clone)]
pub struct FakeVcs {
    inner: Arc<Mutex<FakeVcsState>>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeVcsState {
                calls: Vec::new(),
                branches: HashMap::new(),
                rebase_outcome: RebaseOutcome::clean_success(),
                next_commit: 0,
            })),
        }
    }
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_rebase_outcome(&self, outcome: RebaseOutcome) {
        self.inner.lock().rebase_outcome = outcome;
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn create_branch(&self, base_branch: &str, desired_branch: &str) -> Result<String, VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::CreateBranch {
            base: base_branch.to_string(),
            desired: desired_branch.to_string(),
        });
        let mut candidate = desired_branch.to_string();
        let mut suffix = 1;
        while inner.branches.contains_key(&candidate) {
            candidate = format!("{desired_branch}-{suffix}");
            suffix += 1;
        }
        inner.branches.insert(candidate.clone(), base_branch.to_string());
        Ok(candidate)
    }

    async fn create_worktree(&self, branch: &str, path: &Path) -> Result<PathBuf, VcsError> {
        self.inner.lock().calls.push(VcsCall::CreateWorktree {
            branch: branch.to_string(),
            path: path.to_path_buf(),
        });
        Ok(path.to_path_buf())
    }

    async fn commit_all(&self, worktree: &Path, message: &str) -> Result<String, VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::CommitAll {
            worktree: worktree.to_path_buf(),
            message: message.to_string(),
        });
        inner.next_commit += 1;
        Ok(format!("fake-commit-{}", inner.next_commit))
    }

    async fn commit_empty(&self, worktree: &Path, message: &str) -> Result<String, VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::CommitEmpty {
            worktree: worktree.to_path_buf(),
            message: message.to_string(),
        });
        inner.next_commit += 1;
        Ok(format!("fake-commit-{}", inner.next_commit))
    }

    async fn push(&self, worktree: &Path, branch: &str) -> Result<(), VcsError> {
        self.inner.lock().calls.push(VcsCall::Push {
            worktree: worktree.to_path_buf(),
            branch: branch.to_string(),
        });
        Ok(())
    }

    async fn force_push(&self, worktree: &Path, branch: &str) -> Result<(), VcsError> {
        self.inner.lock().calls.push(VcsCall::ForcePush {
            worktree: worktree.to_path_buf(),
            branch: branch.to_string(),
        });
        Ok(())
    }

    async fn rebase_on_base(
        &self,
        worktree: &Path,
        branch: &str,
        base_branch: &str,
    ) -> Result<RebaseOutcome, VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::RebaseOnBase {
            worktree: worktree.to_path_buf(),
            branch: branch.to_string(),
            base_branch: base_branch.to_string(),
        });
        Ok(inner.rebase_outcome.clone())
    }

    async fn resolve_cr_url(&self, branch: &str) -> Result<Option<String>, VcsError> {
        Ok(Some(format!("https://example.invalid/cr/{branch}")))
    }
}

/// One recorded call against a fake `ReviewProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewProviderCall {
    CreateDraftCr { branch: String },
    UpdateCrBody { cr: String },
    MarkCrReady { cr: String },
    PostComment { cr: String, body: String },
    SubmitReview { cr: String, verdict: String },
}

struct FakeReviewProviderState {
    calls: Vec<ReviewProviderCall>,
    crs: HashMap<String, CrState>,
    feedback: HashMap<String, FeedbackBatch>,
    next_cr: u64,
}

#[derive(Clone)]
pub struct FakeReviewProvider {
    inner: Arc<Mutex<FakeReviewProviderState>>,
}

impl Default for FakeReviewProvider {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeReviewProviderState {
                calls: Vec::new(),
                crs: HashMap::new(),
                feedback: HashMap::new(),
                next_cr: 0,
            })),
        }
    }
}

impl FakeReviewProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ReviewProviderCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_cr_state(&self, cr: &str, state: CrState) {
        self.inner.lock().crs.insert(cr.to_string(), state);
    }

    pub fn queue_feedback(&self, cr: &str, batch: FeedbackBatch) {
        self.inner.lock().feedback.insert(cr.to_string(), batch);
    }
}

#[async_trait]
impl ReviewProvider for FakeReviewProvider {
    async fn create_draft_cr(
        &self,
        branch: &str,
        _title: &str,
        _body: &str,
    ) -> Result<String, ReviewProviderError> {
        let mut inner = self.inner.lock();
        inner.next_cr += 1;
        let cr = format!("cr-{}", inner.next_cr);
        inner.crs.insert(cr.clone(), CrState::Draft);
        inner.calls.push(ReviewProviderCall::CreateDraftCr {
            branch: branch.to_string(),
        });
        Ok(cr)
    }

    async fn update_cr_body(&self, cr: &str, _body: &str) -> Result<(), ReviewProviderError> {
        self.inner.lock().calls.push(ReviewProviderCall::UpdateCrBody {
            cr: cr.to_string(),
        });
        Ok(())
    }

    async fn mark_cr_ready(&self, cr: &str) -> Result<(), ReviewProviderError> {
        let mut inner = self.inner.lock();
        inner.crs.insert(cr.to_string(), CrState::Open);
        inner.calls.push(ReviewProviderCall::MarkCrReady { cr: cr.to_string() });
        Ok(())
    }

    async fn get_cr_state(&self, cr: &str) -> Result<CrState, ReviewProviderError> {
        self.inner
            .lock()
            .crs
            .get(cr)
            .copied()
            .ok_or_else(|| ReviewProviderError::NoSuchCr(cr.to_string()))
    }

    async fn fetch_feedback(&self, cr: &str) -> Result<FeedbackBatch, ReviewProviderError> {
        Ok(self.inner.lock().feedback.get(cr).cloned().unwrap_or_default())
    }

    async fn post_comment(&self, cr: &str, body: &str) -> Result<(), ReviewProviderError> {
        self.inner.lock().calls.push(ReviewProviderCall::PostComment {
            cr: cr.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn submit_review(
        &self,
        cr: &str,
        submission: ReviewSubmission,
    ) -> Result<(), ReviewProviderError> {
        self.inner.lock().calls.push(ReviewProviderCall::SubmitReview {
            cr: cr.to_string(),
            verdict: submission.verdict,
        });
        Ok(())
    }

    async fn bot_login(&self) -> Result<String, ReviewProviderError> {
        Ok("prloom-bot".to_string())
    }
}

/// A scripted `AgentAdapter`: always returns a synchronous exit code of 0
/// unless [`FakeAgentAdapter::fail_next`] was called.
#[derive(Clone)]
pub struct FakeAgentAdapter {
    calls: Arc<Mutex<Vec<AgentExecuteRequest>>>,
    next_pid: Arc<AtomicU64>,
    should_fail: Arc<Mutex<bool>>,
}

impl Default for FakeAgentAdapter {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            next_pid: Arc::new(AtomicU64::new(1)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AgentExecuteRequest> {
        self.calls.lock().clone()
    }

    pub fn fail_next(&self) {
        *self.should_fail.lock() = true;
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn execute(
        &self,
        request: AgentExecuteRequest,
    ) -> Result<AgentExecuteResult, AgentAdapterError> {
        self.calls.lock().push(request.clone());
        if std::mem::take(&mut *self.should_fail.lock()) {
            return Err(AgentAdapterError::SpawnFailed("scripted failure".to_string()));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst) as u32;
        Ok(AgentExecuteResult::detached_pid(pid))
    }
}

/// An in-memory `PlanDoc`: plans are registered with [`FakePlanDoc::put`]
/// rather than read from disk.
#[derive(Clone, Default)]
pub struct FakePlanDoc {
    docs: Arc<Mutex<HashMap<PathBuf, PlanDocument>>>,
}

impl FakePlanDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: impl Into<PathBuf>, doc: PlanDocument) {
        self.docs.lock().insert(path.into(), doc);
    }

    pub fn get(&self, path: &Path) -> Option<PlanDocument> {
        self.docs.lock().get(path).cloned()
    }
}

#[async_trait]
impl PlanDoc for FakePlanDoc {
    async fn parse(&self, path: &Path) -> Result<PlanDocument, PlanDocError> {
        self.docs
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| PlanDocError::NotFound(path.display().to_string()))
    }

    async fn create(&self, path: &Path, doc: &PlanDocument) -> Result<(), PlanDocError> {
        self.docs.lock().insert(path.to_path_buf(), doc.clone());
        Ok(())
    }

    fn extract_body(&self, doc: &PlanDocument) -> String {
        crate::interfaces::plan_doc::plain_body(doc)
    }

    async fn find_next_unchecked(&self, path: &Path) -> Result<Option<usize>, PlanDocError> {
        let docs = self.docs.lock();
        let doc = docs
            .get(path)
            .ok_or_else(|| PlanDocError::NotFound(path.display().to_string()))?;
        Ok(doc.find_next_unchecked().map(|t| t.index))
    }

    async fn add_todos(&self, path: &Path, texts: &[String]) -> Result<(), PlanDocError> {
        let mut docs = self.docs.lock();
        let doc = docs
            .get_mut(path)
            .ok_or_else(|| PlanDocError::NotFound(path.display().to_string()))?;
        let mut next_index = doc.todos.len();
        for text in texts {
            doc.todos.push(crate::plan::Todo::new(next_index, text.clone()));
            next_index += 1;
        }
        Ok(())
    }

    async fn append_progress_log(&self, path: &Path, text: &str) -> Result<(), PlanDocError> {
        let mut docs = self.docs.lock();
        let doc = docs
            .get_mut(path)
            .ok_or_else(|| PlanDocError::NotFound(path.display().to_string()))?;
        doc.body.push('\n');
        doc.body.push_str(text);
        Ok(())
    }

    async fn set_todo_done(&self, path: &Path, index: usize, done: bool) -> Result<(), PlanDocError> {
        let mut docs = self.docs.lock();
        let doc = docs
            .get_mut(path)
            .ok_or_else(|| PlanDocError::NotFound(path.display().to_string()))?;
        let todo = doc
            .todos
            .get_mut(index)
            .ok_or_else(|| PlanDocError::ParseError(format!("no TODO at index {index}")))?;
        todo.done = done;
        Ok(())
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
