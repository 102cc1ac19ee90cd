//! Offers advertised by the cluster manager.

use ballast_id::{AgentId, OfferId};
use serde::{Deserialize, Serialize};

use crate::Resource;

/// An immutable snapshot of resources advertised on one worker node.
///
/// Offers are valid for a short time; the scheduler either applies
/// operations against them or returns them via a decline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Unique offer id, valid for this offer cycle only.
    pub id: OfferId,

    /// Agent the offered resources live on.
    pub agent_id: AgentId,

    /// Hostname of the agent, for logging.
    pub hostname: String,

    /// Resources bundled in this offer.
    pub resources: Vec<Resource>,
}

impl Offer {
    /// Creates an offer with the provided resources.
    #[must_use]
    pub fn new(id: OfferId, agent_id: AgentId, hostname: &str, resources: Vec<Resource>) -> Self {
        Self {
            id,
            agent_id,
            hostname: hostname.to_string(),
            resources,
        }
    }
}

/// An offer grouped with the subset of its resources flagged as
/// unexpected (candidates for destroy/unreserve cleanup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferResources {
    /// The offer the flagged resources belong to.
    pub offer: Offer,

    /// Resources within the offer that nothing in the service expects.
    pub resources: Vec<Resource>,
}

impl OfferResources {
    /// Groups an offer with its unexpected resources.
    #[must_use]
    pub fn new(offer: Offer, resources: Vec<Resource>) -> Self {
        Self { offer, resources }
    }
}
