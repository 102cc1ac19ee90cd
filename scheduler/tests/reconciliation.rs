//! Integration test for the two-phase reconciliation protocol.
//!
//! Walks the full lifecycle: explicit requests with backoff while tasks
//! remain unreconciled, one implicit request once the set drains, then a
//! latched no-op state until the next start().

use std::sync::Arc;

use ballast_protocol::{TaskState, TaskStatus};
use ballast_scheduler::clock::ManualClock;
use ballast_scheduler::driver::MockDriver;
use ballast_scheduler::reconciler::Reconciler;
use ballast_scheduler::state::InMemoryStateStore;

fn status(task: &str, state: TaskState) -> TaskStatus {
    TaskStatus::new(
        task.parse().unwrap(),
        state,
        "agent-1".parse().unwrap(),
        1000,
    )
}

#[tokio::test]
async fn test_full_reconciliation_lifecycle() {
    const T0: u64 = 1_700_000_000_000;

    let driver = Arc::new(MockDriver::new());
    let clock = Arc::new(ManualClock::starting_at(T0));
    let store = Arc::new(InMemoryStateStore::with_statuses([
        status("t1__a", TaskState::Running),
        status("t2__b", TaskState::Staging),
        status("t3__c", TaskState::Finished),
    ]));
    let reconciler = Reconciler::new(store, driver.clone(), clock.clone());

    // Terminal statuses are not tracked.
    reconciler.start().unwrap();
    assert_eq!(reconciler.remaining().len(), 2);

    // First explicit request covers both tracked tasks; backoff moves to 8s.
    reconciler.reconcile().await;
    assert_eq!(driver.reconciles().len(), 1);
    assert_eq!(driver.reconciles()[0].len(), 2);

    // A status report for t1 shrinks the set.
    reconciler.update(&status("t1__a", TaskState::Running));
    assert_eq!(reconciler.remaining().len(), 1);

    // 100ms later the timer has not expired: no driver call.
    clock.set_ms(T0 + 100);
    reconciler.reconcile().await;
    assert_eq!(driver.reconciles().len(), 1);

    // Past the 8s backoff the remaining task is requested again.
    clock.set_ms(T0 + 8001);
    reconciler.reconcile().await;
    assert_eq!(driver.reconciles().len(), 2);
    assert_eq!(driver.reconciles()[1].len(), 1);
    assert_eq!(driver.reconciles()[1][0].task_id.to_string(), "t2__b");

    // Draining the set makes the next call the implicit (empty) request.
    reconciler.update(&status("t2__b", TaskState::Running));
    assert!(reconciler.is_reconciled());
    reconciler.reconcile().await;
    assert_eq!(driver.reconciles().len(), 3);
    assert!(driver.reconciles()[2].is_empty());

    // Latched: further calls are no-ops until the next start().
    reconciler.reconcile().await;
    reconciler.reconcile().await;
    assert_eq!(driver.reconciles().len(), 3);

    reconciler.start().unwrap();
    assert_eq!(reconciler.remaining().len(), 2);
    reconciler.reconcile().await;
    assert_eq!(driver.reconciles().len(), 4);
}
