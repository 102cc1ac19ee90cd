//! Task-status reconciliation.
//!
//! Synchronizes the scheduler's view of task state with the cluster
//! manager's, treating the cluster manager as the source of truth. The
//! protocol runs in phases across repeated [`Reconciler::reconcile`]
//! calls:
//!
//! 1. While unreconciled tasks remain, request their status explicitly,
//!    backing off exponentially between requests.
//! 2. Once the set drains, issue one implicit request covering every task
//!    the cluster manager believes we own.
//! 3. Latch complete until [`Reconciler::start`] is called again.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ballast_id::TaskId;
use ballast_protocol::TaskStatus;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::driver::SchedulerDriver;
use crate::error::SchedulerError;
use crate::state::StateStore;

/// Backoff between explicit reconcile requests: 4s doubling up to 30s.
const BASE_BACKOFF_MS: u64 = 4000;
const MULTIPLIER: u64 = 2;
const MAX_BACKOFF_MS: u64 = 30000;

struct TimerState {
    /// Tasks awaiting a status report. Only ever holds non-terminal
    /// statuses, and only shrinks between `start()` calls.
    unreconciled: HashMap<TaskId, TaskStatus>,
    last_request_ms: u64,
    backoff_ms: u64,
}

impl TimerState {
    fn reset_timer(&mut self) {
        self.last_request_ms = 0;
        self.backoff_ms = BASE_BACKOFF_MS;
    }
}

/// Two-phase task-status reconciler.
///
/// All entry points are safe to call from any task. No driver call is
/// ever made while the internal lock is held: the pending set is
/// snapshotted under the lock, the lock released, and only then is the
/// driver invoked.
pub struct Reconciler {
    state_store: Arc<dyn StateStore>,
    driver: Arc<dyn SchedulerDriver>,
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
    implicit_triggered: AtomicBool,
}

impl Reconciler {
    /// Creates a reconciler over the given store, driver, and clock.
    pub fn new(
        state_store: Arc<dyn StateStore>,
        driver: Arc<dyn SchedulerDriver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state_store,
            driver,
            clock,
            state: Mutex::new(TimerState {
                unreconciled: HashMap::new(),
                last_request_ms: 0,
                backoff_ms: BASE_BACKOFF_MS,
            }),
            implicit_triggered: AtomicBool::new(false),
        }
    }

    /// Begins a reconciliation round from the statuses the scheduler
    /// currently knows about.
    ///
    /// Replaces the pending set wholesale with the store's non-terminal
    /// statuses, rearms the implicit phase, and resets the backoff timer.
    /// Even when no tasks are known, the implicit phase still runs.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let statuses = self.state_store.fetch_statuses()?;

        let mut state = self.state.lock().unwrap();
        state.unreconciled = statuses
            .iter()
            .filter(|status| !status.is_terminal())
            .map(|status| (status.task_id.clone(), status.clone()))
            .collect();
        state.reset_timer();
        self.implicit_triggered.store(false, Ordering::SeqCst);

        info!(
            known = statuses.len(),
            unreconciled = state.unreconciled.len(),
            "Reconciliation started"
        );
        Ok(())
    }

    /// Advances the reconciliation protocol; expected to be called
    /// repeatedly from a timer and from offer cycles.
    pub async fn reconcile(&self) {
        if self.implicit_triggered.load(Ordering::SeqCst) {
            // Implicit reconciliation already fired; nothing left to do
            // until the next start().
            return;
        }

        // Snapshot under the lock, release, then call the driver.
        let tasks_to_reconcile: Vec<TaskStatus> = {
            let mut state = self.state.lock().unwrap();
            if !state.unreconciled.is_empty() {
                let now_ms = self.clock.now_ms();
                if now_ms < state.last_request_ms + state.backoff_ms {
                    info!(
                        wait_ms = state.last_request_ms + state.backoff_ms - now_ms,
                        remaining = state.unreconciled.len(),
                        "Too soon since last explicit reconciliation trigger"
                    );
                    return;
                }
                state.last_request_ms = now_ms;
                state.backoff_ms = state
                    .backoff_ms
                    .checked_mul(MULTIPLIER)
                    .map_or(MAX_BACKOFF_MS, |next| next.min(MAX_BACKOFF_MS));

                state.unreconciled.values().cloned().collect()
            } else {
                // Rearm the timer in case we're started again later.
                state.reset_timer();
                self.implicit_triggered.store(true, Ordering::SeqCst);
                Vec::new()
            }
        };

        if tasks_to_reconcile.is_empty() {
            info!("Triggering implicit final reconciliation of all tasks");
        } else {
            info!(
                remaining = tasks_to_reconcile.len(),
                "Triggering explicit reconciliation of remaining tasks"
            );
        }

        if let Err(e) = self.driver.reconcile_tasks(&tasks_to_reconcile).await {
            warn!(error = %e, "Reconcile request failed; will retry on a later trigger");
        }
    }

    /// Marks a task as reconciled when a status report arrives for it.
    ///
    /// Reports for unknown tasks and reports arriving after the set has
    /// drained are no-ops.
    pub fn update(&self, status: &TaskStatus) {
        let mut state = self.state.lock().unwrap();
        if state.unreconciled.is_empty() {
            return;
        }
        if state.unreconciled.remove(&status.task_id).is_some() {
            info!(
                task_id = %status.task_id,
                remaining = state.unreconciled.len(),
                "Reconciled task"
            );
        }
    }

    /// Whether every explicitly tracked task has been reconciled.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.state.lock().unwrap().unreconciled.is_empty()
    }

    /// Remaining unreconciled task ids, for validation in tests.
    #[must_use]
    pub fn remaining(&self) -> HashSet<TaskId> {
        self.state
            .lock()
            .unwrap()
            .unreconciled
            .keys()
            .cloned()
            .collect()
    }
}
