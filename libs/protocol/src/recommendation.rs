//! Recommendations: intents to apply one operation against one offer.

use ballast_id::OfferId;
use serde::{Deserialize, Serialize};

use crate::{Resource, TaskSpec};

/// An operation submitted to the cluster manager when accepting offers.
///
/// The lifecycle of reserved resources is
/// `Reserve → Create → Destroy → Unreserve`; operations against one
/// reservation must respect that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Launch a task against offered resources.
    Launch { task: TaskSpec },
    /// Reserve resources for later use.
    Reserve { resource: Resource },
    /// Create a persistent volume on reserved disk.
    Create { volume: Resource },
    /// Destroy a persistent volume.
    Destroy { volume: Resource },
    /// Release a reservation back to the cluster.
    Unreserve { resource: Resource },
}

/// An intent to apply one operation against one offer.
///
/// `Store` is a bookkeeping marker: it asks the scheduler to persist the
/// task it describes without submitting anything to the cluster manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfferRecommendation {
    /// Launch a task against the offer.
    Launch { offer_id: OfferId, task: TaskSpec },
    /// Reserve a resource from the offer.
    Reserve {
        offer_id: OfferId,
        resource: Resource,
    },
    /// Create a persistent volume from the offer's reserved disk.
    Create { offer_id: OfferId, volume: Resource },
    /// Destroy a persistent volume advertised in the offer.
    Destroy { offer_id: OfferId, volume: Resource },
    /// Release a reservation advertised in the offer.
    Unreserve {
        offer_id: OfferId,
        resource: Resource,
    },
    /// Persist task info locally; no cluster operation.
    Store { offer_id: OfferId, task: TaskSpec },
}

impl OfferRecommendation {
    /// The offer this recommendation applies against.
    #[must_use]
    pub fn offer_id(&self) -> &OfferId {
        match self {
            Self::Launch { offer_id, .. }
            | Self::Reserve { offer_id, .. }
            | Self::Create { offer_id, .. }
            | Self::Destroy { offer_id, .. }
            | Self::Unreserve { offer_id, .. }
            | Self::Store { offer_id, .. } => offer_id,
        }
    }

    /// The operation to submit to the cluster manager, if any.
    ///
    /// `Store` recommendations are local bookkeeping and produce none.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Launch { task, .. } => Some(Operation::Launch { task: task.clone() }),
            Self::Reserve { resource, .. } => Some(Operation::Reserve {
                resource: resource.clone(),
            }),
            Self::Create { volume, .. } => Some(Operation::Create {
                volume: volume.clone(),
            }),
            Self::Destroy { volume, .. } => Some(Operation::Destroy {
                volume: volume.clone(),
            }),
            Self::Unreserve { resource, .. } => Some(Operation::Unreserve {
                resource: resource.clone(),
            }),
            Self::Store { .. } => None,
        }
    }

    /// Short label for metrics and logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch { .. } => "launch",
            Self::Reserve { .. } => "reserve",
            Self::Create { .. } => "create",
            Self::Destroy { .. } => "destroy",
            Self::Unreserve { .. } => "unreserve",
            Self::Store { .. } => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer_id() -> OfferId {
        "offer-a".parse().unwrap()
    }

    #[test]
    fn test_offer_id_accessor() {
        let rec = OfferRecommendation::Unreserve {
            offer_id: offer_id(),
            resource: Resource::scalar("cpus", 1.0),
        };
        assert_eq!(rec.offer_id(), &offer_id());
    }

    #[test]
    fn test_store_produces_no_operation() {
        let rec = OfferRecommendation::Store {
            offer_id: offer_id(),
            task: TaskSpec::new("web-0", vec![]),
        };
        assert!(rec.operation().is_none());
        assert_eq!(rec.kind(), "store");
    }

    #[test]
    fn test_launch_operation() {
        let rec = OfferRecommendation::Launch {
            offer_id: offer_id(),
            task: TaskSpec::new("web-0", vec![Resource::scalar("cpus", 0.5)]),
        };
        match rec.operation() {
            Some(Operation::Launch { task }) => assert_eq!(task.name, "web-0"),
            other => panic!("unexpected operation: {other:?}"),
        }
    }
}
