// [libs/domain/models/src/commitment.rs]
use crate::ids::{ProjectId, ResourceName, ServiceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a commitment. This is the authoritative status set;
/// an older, coarser `CommitmentState` enum used by some clients is
/// intentionally not modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentStatus {
    Planned,
    Pending,
    Confirmed,
    Superseded,
    Expired,
}

/// Whether a confirmed commitment has been offered up for takeover by
/// another project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    None,
    Public,
}

/// Why a commitment record was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreationReason {
    Create,
    Split,
    Renew,
}

/// Why a commitment record was superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupersedeReason {
    Consume,
    Split,
    Renew,
    Expire,
}

/// Predecessor chain. Represented as a flat list of UUIDs rather than an
/// object graph to keep commitment
/// records independently ownable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreationContext {
    pub reason: CreationReason,
    pub predecessors: Vec<Uuid>,
}

impl Default for CreationReason {
    fn default() -> Self {
        CreationReason::Create
    }
}

/// Successor chain, set the moment a commitment is superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupersedeContext {
    pub reason: SupersedeReason,
    pub successors: Vec<Uuid>,
    /// The commitment (usually in another project) whose confirmation or
    /// transfer consumption this supersession serves, when the reason is
    /// `Consume`. Populated by `TransferableCache::check_and_consume`.
    pub related_commitment: Option<Uuid>,
}

/// A project's reservation of capacity for a duration, in exchange for a
/// confirmation guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub service_type: ServiceType,
    pub resource_name: ResourceName,
    pub az: crate::az::AvailabilityZone,

    pub amount: u64,
    pub duration_seconds: i64,

    pub status: CommitmentStatus,
    pub transfer_status: TransferStatus,
    pub transfer_token: Option<String>,

    pub creator_uuid: Uuid,
    pub creator_name: String,

    pub created_at: DateTime<Utc>,
    pub confirm_by: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
    pub transfer_started_at: Option<DateTime<Utc>>,

    pub creation_context: CreationContext,
    pub supersede_context: Option<SupersedeContext>,
}

impl Commitment {
    /// `amount > 0` is a construction invariant; callers build
    /// commitments through `CommitmentStateMachine::create`, which enforces
    /// it, rather than through this struct literal directly in production
    /// code.
    pub fn is_transferable(&self) -> bool {
        self.transfer_status == TransferStatus::Public
            && !matches!(
                self.status,
                CommitmentStatus::Superseded | CommitmentStatus::Expired
            )
    }
}
