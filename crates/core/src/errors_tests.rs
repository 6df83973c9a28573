// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn hook_failed_message_starts_with_hook_error_prefix() {
    let err = CoreError::HookFailed("plugin threw".to_string());
    assert!(err.to_string().starts_with("Hook error:"));
}

#[test]
fn rebase_conflict_message_starts_with_expected_prefix() {
    let err = CoreError::RebaseConflict("a.txt, b.txt".to_string());
    assert!(err.to_string().starts_with("Rebase conflict:"));
}

#[test]
fn transient_errors_are_not_fatal() {
    let err = CoreError::Vcs(VcsError::PushFailed("timeout".to_string()));
    assert!(!err.is_fatal());
}

#[test]
fn todo_execution_failure_is_fatal() {
    let err = CoreError::TodoExecutionFailed {
        index: 2,
        attempts: 3,
        log_tail: "...".to_string(),
    };
    assert!(err.is_fatal());
}
