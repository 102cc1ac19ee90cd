//! Cluster-manager data model shared across the scheduler.
//!
//! These are the scheduler's immutable snapshots of what the cluster
//! manager advertises (offers and their resources), the status records it
//! reports for tasks, and the operations the scheduler intends to apply
//! back against offers.
//!
//! The wire encoding between this model and the cluster manager is the
//! transport adapter's concern; everything here is plain data.

mod offer;
mod recommendation;
mod resource;
mod task;

pub use offer::{Offer, OfferResources};
pub use recommendation::{OfferRecommendation, Operation};
pub use resource::{DiskInfo, Reservation, Resource};
pub use task::{TaskSpec, TaskState, TaskStatus};

use serde::{Deserialize, Serialize};

/// Interval for which an offer decline suppresses re-offers of the same
/// resources. Cluster-wide constants known to the driver.
pub const SHORT_DECLINE_SECONDS: u64 = 5;

/// Long decline interval, used when the scheduler has looked at an offer
/// and is not interested for a while.
pub const LONG_DECLINE_SECONDS: u64 = 300;

/// Filters attached to driver calls that return offers to the cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Seconds for which the declined resources should not be re-offered.
    pub refuse_seconds: u64,
}

impl Filters {
    /// Filters for the short decline interval.
    #[must_use]
    pub fn refuse_short() -> Self {
        Self {
            refuse_seconds: SHORT_DECLINE_SECONDS,
        }
    }

    /// Filters for the long decline interval.
    #[must_use]
    pub fn refuse_long() -> Self {
        Self {
            refuse_seconds: LONG_DECLINE_SECONDS,
        }
    }
}
