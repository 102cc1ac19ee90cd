//! Resource entries carried by offers.

use ballast_id::ResourceId;
use serde::{Deserialize, Serialize};

/// A reservation label tying a resource to a long-lived claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// The resource id recorded in the reservation label.
    pub resource_id: ResourceId,

    /// Principal the reservation was made under, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
}

/// Disk-specific metadata on a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    /// Persistence id, present for persistent volumes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_id: Option<String>,

    /// Container mount path for the volume, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_path: Option<String>,
}

/// One resource entry within an offer (cpus, mem, disk, ports).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name as advertised by the cluster manager.
    pub name: String,

    /// Scalar amount of the resource.
    pub value: f64,

    /// Reservation label, present for reserved resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,

    /// Disk metadata, present for disk resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskInfo>,
}

impl Resource {
    /// Creates an unreserved scalar resource.
    #[must_use]
    pub fn scalar(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            reservation: None,
            disk: None,
        }
    }

    /// Attaches a reservation label to this resource.
    #[must_use]
    pub fn reserved(mut self, resource_id: ResourceId) -> Self {
        self.reservation = Some(Reservation {
            resource_id,
            principal: None,
        });
        self
    }

    /// Marks this resource as a persistent volume.
    #[must_use]
    pub fn with_persistence(mut self, persistence_id: &str) -> Self {
        self.disk = Some(DiskInfo {
            persistence_id: Some(persistence_id.to_string()),
            container_path: None,
        });
        self
    }

    /// Returns true if this resource carries a reservation label.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    /// Returns the reservation's resource id, if any.
    #[must_use]
    pub fn resource_id(&self) -> Option<&ResourceId> {
        self.reservation.as_ref().map(|r| &r.resource_id)
    }

    /// Returns true if this is a persistent volume.
    ///
    /// A persistent volume must be destroyed before its underlying
    /// reservation can be released.
    #[must_use]
    pub fn has_persistent_volume(&self) -> bool {
        self.disk
            .as_ref()
            .is_some_and(|d| d.persistence_id.is_some())
    }
}
