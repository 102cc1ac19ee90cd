//! Cleanup planning for unexpected reserved resources.
//!
//! Unexpected reservations appear when a service is uninstalling, when it
//! decommissions a subset of its tasks, or when an agent returns after
//! being gone long enough that its tasks were relocated and the resources
//! forgotten. In every case the reservations must be handed back to the
//! cluster.

use ballast_protocol::{OfferRecommendation, OfferResources};
use tracing::info;

/// Converts unexpected resources into an ordered list of destroy and
/// unreserve recommendations.
///
/// The resource lifecycle is `Reserve → Create → Destroy → Unreserve`, so
/// every `Destroy` is emitted ahead of every `Unreserve`. Pure function;
/// no I/O.
#[must_use]
pub fn cleanup_recommendations(offer_resources: &[OfferResources]) -> Vec<OfferRecommendation> {
    let mut destroys = Vec::new();
    let mut unreserves = Vec::new();

    for group in offer_resources {
        for resource in &group.resources {
            if resource.has_persistent_volume() {
                info!(
                    offer_id = %group.offer.id,
                    resource = %resource.name,
                    "Volume to be destroyed"
                );
                destroys.push(OfferRecommendation::Destroy {
                    offer_id: group.offer.id.clone(),
                    volume: resource.clone(),
                });
            }
            info!(
                offer_id = %group.offer.id,
                resource = %resource.name,
                "Resource to be unreserved"
            );
            unreserves.push(OfferRecommendation::Unreserve {
                offer_id: group.offer.id.clone(),
                resource: resource.clone(),
            });
        }
    }

    destroys.extend(unreserves);
    destroys
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_protocol::{Offer, Resource};

    fn offer(id: &str, resources: Vec<Resource>) -> Offer {
        Offer::new(
            id.parse().unwrap(),
            "agent-1".parse().unwrap(),
            "host-1",
            resources,
        )
    }

    #[test]
    fn test_empty_input() {
        assert!(cleanup_recommendations(&[]).is_empty());
    }

    #[test]
    fn test_reserved_resource_gets_unreserve_only() {
        let resource = Resource::scalar("cpus", 1.0).reserved("res-1".parse().unwrap());
        let groups = vec![OfferResources::new(
            offer("a", vec![resource.clone()]),
            vec![resource],
        )];

        let recs = cleanup_recommendations(&groups);
        assert_eq!(recs.len(), 1);
        assert!(matches!(recs[0], OfferRecommendation::Unreserve { .. }));
    }

    #[test]
    fn test_persistent_volume_gets_destroy_then_unreserve() {
        let volume = Resource::scalar("disk", 1024.0)
            .reserved("res-2".parse().unwrap())
            .with_persistence("vol-2");
        let groups = vec![OfferResources::new(
            offer("a", vec![volume.clone()]),
            vec![volume],
        )];

        let recs = cleanup_recommendations(&groups);
        assert_eq!(recs.len(), 2);
        assert!(matches!(recs[0], OfferRecommendation::Destroy { .. }));
        assert!(matches!(recs[1], OfferRecommendation::Unreserve { .. }));
    }

    #[test]
    fn test_all_destroys_precede_all_unreserves() {
        let volume = Resource::scalar("disk", 512.0)
            .reserved("res-a".parse().unwrap())
            .with_persistence("vol-a");
        let reservation = Resource::scalar("mem", 256.0).reserved("res-b".parse().unwrap());
        let second_volume = Resource::scalar("disk", 128.0)
            .reserved("res-c".parse().unwrap())
            .with_persistence("vol-c");

        let groups = vec![
            OfferResources::new(
                offer("a", vec![volume.clone(), reservation.clone()]),
                vec![volume, reservation],
            ),
            OfferResources::new(
                offer("b", vec![second_volume.clone()]),
                vec![second_volume],
            ),
        ];

        let recs = cleanup_recommendations(&groups);
        let kinds: Vec<_> = recs.iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec!["destroy", "destroy", "unreserve", "unreserve", "unreserve"]
        );

        let last_destroy = kinds.iter().rposition(|k| *k == "destroy").unwrap();
        let first_unreserve = kinds.iter().position(|k| *k == "unreserve").unwrap();
        assert!(last_destroy < first_unreserve);
    }
}
