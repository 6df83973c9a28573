//! S2 — worker fails thrice (spec §8).

use prloom_core::{PlanStatus, Todo};

use crate::prelude::Fixture;

#[tokio::test]
async fn three_failed_attempts_block_the_plan_without_committing() {
    let fixture = Fixture::never_completing(vec![Todo::new(0, "Ship it")]);
    let mut ps = fixture.active_state();

    for _ in 0..3 {
        fixture.advance(&mut ps).await.expect("advance");
    }

    assert!(ps.blocked, "plan blocks after the third failed attempt");
    assert_eq!(ps.todo_retry_count, 3);
    assert!(
        ps.last_error.as_deref().unwrap_or_default().contains("failed after 3 retries"),
        "last_error was {:?}",
        ps.last_error
    );
    assert_eq!(ps.status, PlanStatus::Active, "status itself is untouched; only the blocked latch moves");
    assert!(fixture.vcs.calls().is_empty(), "no commit ever happens for a TODO that never completes");
}
