//! Scheduler error types.

use thiserror::Error;

use crate::state::StateStoreError;

/// Errors surfaced by the scheduler core.
///
/// These are the structural failures. Transient cluster errors (a failed
/// decline, a client that is not ready) are logged and absorbed at the
/// call site instead of being raised.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The task-status store failed; fatal at boot.
    #[error("state store error: {0}")]
    StateStore(#[from] StateStoreError),

    /// Offers were still marked in progress after the waiting deadline.
    #[error("timed out after {waited_ms}ms waiting for offers to be processed")]
    AwaitOffersTimeout { waited_ms: u64 },
}
