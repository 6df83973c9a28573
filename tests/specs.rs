//! Dispatcher-level end-to-end scenarios (spec §8 "Concrete end-to-end
//! scenarios"). Each `dispatcher/sN_*.rs` file drives `advance_one`
//! directly against the crates' public APIs and in-memory fakes — no
//! subprocess, git, or network dependency.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/dispatcher/s1_happy_path.rs"]
mod dispatcher_s1_happy_path;
#[path = "specs/dispatcher/s2_worker_retry_exhaustion.rs"]
mod dispatcher_s2_worker_retry_exhaustion;
#[path = "specs/dispatcher/s3_before_finish_hook.rs"]
mod dispatcher_s3_before_finish_hook;
#[path = "specs/dispatcher/s4_event_interception.rs"]
mod dispatcher_s4_event_interception;
#[path = "specs/dispatcher/s5_commit_review_gate.rs"]
mod dispatcher_s5_commit_review_gate;
#[path = "specs/dispatcher/s6_rebase_conflict.rs"]
mod dispatcher_s6_rebase_conflict;
#[path = "specs/dispatcher/s7_event_triage_routing.rs"]
mod dispatcher_s7_event_triage_routing;
