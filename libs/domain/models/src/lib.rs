// [libs/domain/models/src/lib.rs]
//! Data model of the quota-and-commitment control plane.
//!
//! Every type here is a pure value: no I/O, no clocks, no randomness.
//! Loading and persisting these types is the job of `quotaward-infra-storage`;
//! deriving new values from them is the job of the `quotaward-core-*` crates.

pub mod az;
pub mod capacity;
pub mod commitment;
pub mod ids;
pub mod quota;

pub use az::{AvailabilityZone, Topology};
pub use capacity::{AllocationStats, AzAllocationStats, AzResource, ClusterResource};
pub use commitment::{
    Commitment, CommitmentStatus, CreationContext, CreationReason, SupersedeContext,
    SupersedeReason, TransferStatus,
};
pub use ids::{ProjectId, ResourceName, ServiceType};
pub use quota::{
    AutogrowConfig, CommitmentBehavior, LocalQuotaConstraints, ProjectAzAllocationStats,
    ProjectResourceQuota,
};
