// [libs/domain/models/src/capacity.rs]
use crate::az::{AvailabilityZone, Topology};
use crate::ids::{ProjectId, ResourceName, ServiceType};
use crate::quota::ProjectAzAllocationStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `(ServiceType, ResourceName)` pair and the metadata that is immutable
/// within one configuration version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResource {
    pub service_type: ServiceType,
    pub resource_name: ResourceName,
    pub unit: String,
    pub topology: Topology,
    pub has_quota: bool,
    pub has_capacity: bool,
}

/// Raw and effective capacity for one `(ServiceType, ResourceName, AZ)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzResource {
    pub raw_capacity: u64,
    pub overcommit_factor: f64,
    /// Sticky flag: has this AZ ever reported nonzero raw capacity. Used by
    /// the ACPQ overcommit-permission rule to distinguish an
    /// AZ that is still being built out from one that has been decommissioned.
    pub observed_nonzero_capacity_before: bool,
}

impl AzResource {
    pub fn new(raw_capacity: u64, overcommit_factor: f64) -> Self {
        Self {
            raw_capacity,
            overcommit_factor,
            observed_nonzero_capacity_before: raw_capacity > 0,
        }
    }

    /// `Capacity = OvercommitFactor · RawCapacity`, floored to the nearest
    /// unit.
    pub fn capacity(&self) -> u64 {
        ((self.raw_capacity as f64) * self.overcommit_factor).floor() as u64
    }
}

/// Per-AZ allocation snapshot: the AZ's capacity plus every project's usage,
/// commitment and historical-envelope figures for that AZ.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzAllocationStats {
    pub az_resource: Option<AzResource>,
    pub projects: BTreeMap<ProjectId, ProjectAzAllocationStats>,
}

impl AzAllocationStats {
    pub fn capacity(&self) -> u64 {
        self.az_resource.map(|r| r.capacity()).unwrap_or(0)
    }

    /// `Σ max(Committed, Usage)` over all projects in this AZ — the
    /// "used capacity" figure that both commitment admission and the
    /// quota distributor's overcommit-permission rule are built on.
    pub fn used_capacity(&self) -> u64 {
        self.projects
            .values()
            .map(|p| p.committed.max(p.usage))
            .sum()
    }
}

/// One query's worth of `AllocationStats` for a `(ServiceType, ResourceName)`
/// across all AZs. Owned transiently by one pass; never
/// mutated by anyone but the component that loaded it and the scheduler
/// that updates it in-memory within a single pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationStats {
    pub service_type: Option<ServiceType>,
    pub resource_name: Option<ResourceName>,
    pub by_az: BTreeMap<AvailabilityZone, AzAllocationStats>,
}

impl AllocationStats {
    pub fn new(service_type: ServiceType, resource_name: ResourceName) -> Self {
        Self {
            service_type: Some(service_type),
            resource_name: Some(resource_name),
            by_az: BTreeMap::new(),
        }
    }

    pub fn az(&self, az: &AvailabilityZone) -> Option<&AzAllocationStats> {
        self.by_az.get(az)
    }

    pub fn az_mut(&mut self, az: &AvailabilityZone) -> &mut AzAllocationStats {
        self.by_az.entry(az.clone()).or_default()
    }
}
