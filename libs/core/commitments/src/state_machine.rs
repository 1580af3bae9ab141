// [libs/core/commitments/src/state_machine.rs]
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use quotaward_domain_models::{
    AvailabilityZone, Commitment, CommitmentStatus, CreationContext, CreationReason, ProjectId,
    ResourceName, ServiceType, SupersedeContext, SupersedeReason, TransferStatus,
};

use crate::clock::{Clock, IdSource};
use crate::errors::Error;

/// Window within which only the token-authorized creator of a
/// Reason=Create commitment may delete it; beyond that a more privileged
/// permission is required (§4.5 deletion policy).
pub const SELF_SERVICE_DELETE_WINDOW: Duration = Duration::hours(24);

/// The lifecycle of a single commitment record (§4.5). Pure: every
/// operation takes a `Commitment` by value and returns the record(s) that
/// result from the transition, plus — for splits and consumption — the
/// sibling record(s). Persisting the results is the caller's job.
pub struct CommitmentStateMachine<'a> {
    clock: &'a dyn Clock,
    ids: &'a dyn IdSource,
}

impl<'a> CommitmentStateMachine<'a> {
    pub fn new(clock: &'a dyn Clock, ids: &'a dyn IdSource) -> Self {
        Self { clock, ids }
    }

    /// `Planned` if `confirm_by` is in the future, else `Pending` directly
    /// (§4.5 Create).
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        project_id: ProjectId,
        service_type: ServiceType,
        resource_name: ResourceName,
        az: AvailabilityZone,
        amount: u64,
        duration_seconds: i64,
        confirm_by: Option<DateTime<Utc>>,
        creator_uuid: Uuid,
        creator_name: String,
    ) -> Commitment {
        let now = self.clock.now();
        let status = match confirm_by {
            Some(at) if at > now => CommitmentStatus::Planned,
            _ => CommitmentStatus::Pending,
        };

        Commitment {
            id: self.ids.new_commitment_id(),
            project_id,
            service_type,
            resource_name,
            az,
            amount,
            duration_seconds,
            status,
            transfer_status: TransferStatus::None,
            transfer_token: None,
            creator_uuid,
            creator_name,
            created_at: now,
            confirm_by,
            confirmed_at: None,
            expires_at: now + Duration::seconds(duration_seconds),
            superseded_at: None,
            transfer_started_at: None,
            creation_context: CreationContext {
                reason: CreationReason::Create,
                predecessors: Vec::new(),
            },
            supersede_context: None,
        }
    }

    /// `Planned -> Pending` once `confirm_by <= now`. A no-op (returns the
    /// commitment unchanged) if `confirm_by` hasn't been reached yet, so
    /// callers can call this unconditionally on a sweep.
    pub fn mature(&self, mut commitment: Commitment) -> Result<Commitment, Error> {
        if commitment.status != CommitmentStatus::Planned {
            return Err(Error::InvalidTransition {
                commitment: commitment.id,
                from: commitment.status,
            });
        }
        let now = self.clock.now();
        let due = commitment.confirm_by.unwrap_or(now);
        if due <= now {
            commitment.status = CommitmentStatus::Pending;
        }
        Ok(commitment)
    }

    /// `Pending -> Confirmed`. The caller is responsible for having
    /// already checked `AdmissionPredicate::can_accept_commitment_changes`
    /// for `{project: amount}` — this function only enforces the state
    /// precondition, matching §4.5's separation between the state machine
    /// and the admission decision.
    pub fn confirm(&self, mut commitment: Commitment) -> Result<Commitment, Error> {
        if commitment.status != CommitmentStatus::Pending {
            return Err(Error::NotPending(commitment.id));
        }
        commitment.status = CommitmentStatus::Confirmed;
        commitment.confirmed_at = Some(self.clock.now());
        Ok(commitment)
    }

    /// Splits `source` into a consumed/kept part of `split_amount` and a
    /// leftover part of `source.amount - split_amount`, preserving the
    /// total (§8 property 5). `source` is superseded with `Reason::Split`
    /// pointing at both children; the new record inherits `source`'s
    /// status (Pending or Confirmed) and carries
    /// `CreationContext{Reason:Split, Predecessor:[source.id]}`.
    pub fn split(&self, mut source: Commitment, split_amount: u64) -> Result<(Commitment, Commitment), Error> {
        if split_amount == 0 || split_amount >= source.amount {
            return Err(Error::InvalidTransition {
                commitment: source.id,
                from: source.status,
            });
        }
        let now = self.clock.now();
        let leftover_amount = source.amount - split_amount;

        let new_id = self.ids.new_commitment_id();
        let mut new_record = source.clone();
        new_record.id = new_id;
        new_record.amount = split_amount;
        new_record.creation_context = CreationContext {
            reason: CreationReason::Split,
            predecessors: vec![source.id],
        };
        new_record.supersede_context = None;
        new_record.superseded_at = None;
        new_record.transfer_status = TransferStatus::None;
        new_record.transfer_token = None;
        new_record.transfer_started_at = None;

        source.amount = leftover_amount;
        source.status = CommitmentStatus::Superseded;
        source.superseded_at = Some(now);
        source.supersede_context = Some(SupersedeContext {
            reason: SupersedeReason::Split,
            successors: vec![new_id],
            related_commitment: None,
        });

        Ok((source, new_record))
    }

    /// Terminal transition to `Superseded` with the given reason and
    /// successor chain (§4.5 Supersede). Used directly by `Renew`, and as
    /// the last step of `Consume`/`Split` flows driven by the transferable
    /// cache.
    pub fn supersede(
        &self,
        mut commitment: Commitment,
        reason: SupersedeReason,
        successors: Vec<Uuid>,
        related_commitment: Option<Uuid>,
    ) -> Result<Commitment, Error> {
        if matches!(commitment.status, CommitmentStatus::Superseded | CommitmentStatus::Expired) {
            return Err(Error::InvalidTransition {
                commitment: commitment.id,
                from: commitment.status,
            });
        }
        commitment.status = CommitmentStatus::Superseded;
        commitment.superseded_at = Some(self.clock.now());
        commitment.supersede_context = Some(SupersedeContext {
            reason,
            successors,
            related_commitment,
        });
        Ok(commitment)
    }

    /// `Confirmed -> Superseded` replacing `commitment` with a fresh
    /// record of the same amount, a new UUID, and `CreationContext{Reason:Renew}`.
    pub fn renew(&self, commitment: Commitment, new_duration_seconds: i64) -> Result<(Commitment, Commitment), Error> {
        if commitment.status != CommitmentStatus::Confirmed {
            return Err(Error::InvalidTransition {
                commitment: commitment.id,
                from: commitment.status,
            });
        }
        let now = self.clock.now();
        let new_id = self.ids.new_commitment_id();

        let mut renewed = commitment.clone();
        renewed.id = new_id;
        renewed.status = CommitmentStatus::Confirmed;
        renewed.created_at = now;
        renewed.confirmed_at = Some(now);
        renewed.expires_at = now + Duration::seconds(new_duration_seconds);
        renewed.duration_seconds = new_duration_seconds;
        renewed.superseded_at = None;
        renewed.supersede_context = None;
        renewed.creation_context = CreationContext {
            reason: CreationReason::Renew,
            predecessors: vec![commitment.id],
        };
        renewed.transfer_status = TransferStatus::None;
        renewed.transfer_token = None;
        renewed.transfer_started_at = None;

        let superseded = self.supersede(commitment, SupersedeReason::Renew, vec![new_id], None)?;
        Ok((superseded, renewed))
    }

    /// Irreversible `-> Expired`, valid from any non-terminal status once
    /// `expires_at <= now`.
    pub fn expire(&self, mut commitment: Commitment) -> Result<Commitment, Error> {
        if matches!(commitment.status, CommitmentStatus::Superseded | CommitmentStatus::Expired) {
            return Err(Error::InvalidTransition {
                commitment: commitment.id,
                from: commitment.status,
            });
        }
        let now = self.clock.now();
        if commitment.expires_at > now {
            return Err(Error::InvalidTransition {
                commitment: commitment.id,
                from: commitment.status,
            });
        }
        commitment.status = CommitmentStatus::Expired;
        Ok(commitment)
    }

    /// Offers a `Confirmed` commitment up for takeover by another project.
    pub fn offer_for_transfer(&self, mut commitment: Commitment) -> Result<Commitment, Error> {
        if commitment.status != CommitmentStatus::Confirmed {
            return Err(Error::InvalidTransition {
                commitment: commitment.id,
                from: commitment.status,
            });
        }
        commitment.transfer_status = TransferStatus::Public;
        commitment.transfer_token = Some(self.ids.new_transfer_token());
        commitment.transfer_started_at = Some(self.clock.now());
        Ok(commitment)
    }

    pub fn withdraw_transfer(&self, mut commitment: Commitment) -> Result<Commitment, Error> {
        if commitment.transfer_status != TransferStatus::Public {
            return Err(Error::NotOffered(commitment.id));
        }
        commitment.transfer_status = TransferStatus::None;
        commitment.transfer_token = None;
        commitment.transfer_started_at = None;
        Ok(commitment)
    }

    /// Accepts a transfer offer, moving ownership to `new_project`.
    /// Self-transfer (accepting your own offer) is forbidden (§3).
    /// Validation of the target project's authorization is the caller's
    /// responsibility (e.g. matching the offered `transfer_token`); this
    /// function only enforces the lifecycle invariant.
    pub fn accept_transfer(&self, mut commitment: Commitment, new_project: ProjectId) -> Result<Commitment, Error> {
        if commitment.transfer_status != TransferStatus::Public {
            return Err(Error::NotOffered(commitment.id));
        }
        if commitment.project_id == new_project {
            return Err(Error::SelfTransfer {
                commitment: commitment.id,
                project: new_project,
            });
        }
        commitment.project_id = new_project;
        commitment.transfer_status = TransferStatus::None;
        commitment.transfer_token = None;
        commitment.transfer_started_at = None;
        Ok(commitment)
    }

    /// Whether `actor` may delete `commitment` under the self-service
    /// policy: creator, within 24h of creation, on a Reason=Create record
    /// not yet past Confirmed. Beyond this window a more privileged
    /// permission is required upstream; this function only tells the
    /// caller whether the *self-service* path applies.
    pub fn actor_may_self_service_delete(&self, commitment: &Commitment, actor: Uuid) -> bool {
        if commitment.creator_uuid != actor {
            return false;
        }
        if commitment.creation_context.reason != CreationReason::Create {
            return false;
        }
        if !matches!(
            commitment.status,
            CommitmentStatus::Planned | CommitmentStatus::Pending | CommitmentStatus::Confirmed
        ) {
            return false;
        }
        self.clock.now() - commitment.created_at <= SELF_SERVICE_DELETE_WINDOW
    }
}
