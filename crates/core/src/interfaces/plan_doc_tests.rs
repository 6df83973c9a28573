// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn plain_body_returns_the_documents_body_unchanged() {
    let doc = PlanDocument::new("Title", "Some context.", vec![]);
    assert_eq!(plain_body(&doc), "Some context.");
}
