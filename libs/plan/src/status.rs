//! Element statuses and the parent-status aggregation rules.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Status of a plan element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// The element has permanently failed or is misconfigured.
    Error,
    /// The element is blocked (interrupted, or waiting on an operator).
    Waiting,
    /// The element has work to do and has not started it.
    Pending,
    /// The element has claimed its work and is awaiting resources.
    Prepared,
    /// The cluster manager has acknowledged the work is starting.
    Starting,
    /// The work is underway (task running, goal not yet reached).
    Started,
    /// Some children are done, others are not.
    InProgress,
    /// The element finished successfully.
    Complete,
}

impl Status {
    /// Returns true once the element can make no further progress.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true while the element is actively consuming resources.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Prepared | Self::Starting | Self::Started | Self::InProgress)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Error => "ERROR",
            Self::Waiting => "WAITING",
            Self::Pending => "PENDING",
            Self::Prepared => "PREPARED",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
        };
        write!(f, "{s}")
    }
}

/// Computes the status a parent element should display for its children.
///
/// `candidates` is the subset of children the parent's strategy has
/// selected to make progress next. Clause ordering matters throughout;
/// the first matching clause wins. This function must not consult the
/// parent's own status (that would cycle).
#[must_use]
pub fn aggregate_status(
    parent_name: &str,
    children: &[Status],
    candidates: &[Status],
    errors: &[String],
    interrupted: bool,
) -> Status {
    let result = if !errors.is_empty() || any(children, Status::Error) {
        Status::Error
    } else if all(children, Status::Complete) {
        Status::Complete
    } else if interrupted {
        Status::Waiting
    } else if any(children, Status::Prepared) {
        Status::InProgress
    } else if any(candidates, Status::Waiting) {
        Status::Waiting
    } else if any(candidates, Status::InProgress) {
        Status::InProgress
    } else if any(children, Status::Complete)
        && (any(candidates, Status::Pending)
            || any(candidates, Status::Starting)
            || any(candidates, Status::Started))
    {
        Status::InProgress
    } else if any(candidates, Status::Pending) {
        Status::Pending
    } else if any(children, Status::Waiting) {
        Status::Waiting
    } else if any(candidates, Status::Starting) {
        Status::Starting
    } else if any(candidates, Status::Started) {
        Status::Started
    } else {
        warn!(
            parent = parent_name,
            children = ?children,
            candidates = ?candidates,
            "Unexpected child/candidate statuses during aggregation"
        );
        Status::Error
    };

    debug!(parent = parent_name, status = %result, "Aggregated element status");
    result
}

fn all(statuses: &[Status], status: Status) -> bool {
    statuses.iter().all(|s| *s == status)
}

fn any(statuses: &[Status], status: Status) -> bool {
    statuses.iter().any(|s| *s == status)
}
