// [libs/core/scheduler/src/port.rs]
use async_trait::async_trait;

use quotaward_domain_models::{AvailabilityZone, AzAllocationStats, Commitment, ResourceName, ServiceType};

use crate::errors::Error;

/// A `(ServiceType, ResourceName, AZ)` triple: the unit of work one
/// `ConfirmationScheduler::run_pass` call covers (§4.7).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub service_type: ServiceType,
    pub resource_name: ResourceName,
    pub az: AvailabilityZone,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.service_type, self.resource_name, self.az)
    }
}

/// Storage boundary the scheduler is written against. `libs/infra/storage`
/// implements this over `libsql`; tests implement it in memory. Every
/// method maps directly to one step of §4.7 so the scheduler itself stays
/// pure control flow over a trait object rather than SQL.
#[async_trait]
pub trait CommitmentStoragePort: Send + Sync {
    /// `Status = Pending` commitments for `location`, ordered by
    /// `(CreatedAt, ConfirmBy, ID)` (§4.7 step 1).
    async fn load_pending(&self, location: &Location) -> Result<Vec<Commitment>, Error>;

    /// The AZ's capacity plus every project's usage/committed/history
    /// figures, per §4.1 (restricted to the one AZ `location` names).
    async fn load_allocation_stats(&self, location: &Location) -> Result<AzAllocationStats, Error>;

    /// `TransferStatus = Public`, non-terminal commitments for `location`,
    /// ordered by `(TransferStartedAt, CreatedAt, ID)` (§4.6).
    async fn load_transfer_offers(&self, location: &Location) -> Result<Vec<Commitment>, Error>;

    /// Persists a commitment that was just moved to `Confirmed`.
    async fn persist_confirmed(&self, commitment: &Commitment) -> Result<(), Error>;

    /// Persists a commitment that was superseded this pass, whether fully
    /// consumed or the consumed slice of a split offer.
    async fn persist_superseded(&self, commitment: &Commitment) -> Result<(), Error>;

    /// Persists the leftover half of a partially consumed offer, still
    /// `Public` with its new transfer token.
    async fn persist_offer_update(&self, commitment: &Commitment) -> Result<(), Error>;
}
