// [libs/domain/models/src/az.rs]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How a resource's quota/capacity is carved up across availability zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// No AZ distinction; everything lives in the `any` pseudo-AZ.
    Flat,
    /// Quota is per-AZ but an `any` pool absorbs unallocated capacity.
    AzAware,
    /// Quota is strictly per-AZ; `any` never carries quota.
    AzSeparated,
}

/// A real availability zone name, or one of the two pseudo-AZs.
///
/// `Any` is the unallocated capacity pool for `Flat`/`AzAware` resources;
/// `Unknown` is the degenerate AZ used when a backend cannot attribute
/// usage to a real zone. Ordering puts real AZs first in name order, with
/// `Any` and `Unknown` sorting after them — this is what gives quota
/// distribution its "real AZs before pseudo-AZs" deterministic iteration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvailabilityZone {
    Named(String),
    Any,
    Unknown,
}

impl AvailabilityZone {
    pub fn is_real(&self) -> bool {
        matches!(self, AvailabilityZone::Named(_))
    }

    pub fn is_pseudo(&self) -> bool {
        !self.is_real()
    }

    fn sort_key(&self) -> (u8, &str) {
        match self {
            AvailabilityZone::Named(name) => (0, name.as_str()),
            AvailabilityZone::Any => (1, ""),
            AvailabilityZone::Unknown => (2, ""),
        }
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityZone::Named(name) => write!(f, "{name}"),
            AvailabilityZone::Any => write!(f, "any"),
            AvailabilityZone::Unknown => write!(f, "unknown"),
        }
    }
}

impl PartialOrd for AvailabilityZone {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AvailabilityZone {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
