// [libs/core/scheduler/src/scheduler.rs]
use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, instrument};

use quotaward_core_admission::can_accept_commitment_changes;
use quotaward_core_commitments::{Clock, CommitmentStateMachine, IdSource, TransferableCache};
use quotaward_domain_models::{Commitment, CommitmentBehavior, CommitmentStatus, ProjectId};
use quotaward_domain_notification::{CommitmentNotice, MailNotification, NotificationCategory};

use crate::audit::{AuditCategory, AuditEvent};
use crate::errors::Error;
use crate::liquid_backend::{CommitmentChangeRequest, CommitmentTransition, LiquidBackend};
use crate::port::{CommitmentStoragePort, Location};

/// Everything one `run_pass` call produced, for the caller to hand to a
/// `MailSink` and an `AuditSink` (both out of this crate's scope per
/// spec.md §1 — it only builds the values).
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub confirmed_count: usize,
    pub consumed_offer_count: usize,
    pub mail: Vec<MailNotification>,
    pub audit: Vec<AuditEvent>,
}

pub struct ConfirmationScheduler<'a> {
    clock: &'a dyn Clock,
    ids: &'a dyn IdSource,
    port: &'a dyn CommitmentStoragePort,
    backend: &'a dyn LiquidBackend,
}

/// Per-project bookkeeping used to build the collated, deduplicated mail
/// and audit output at the end of a pass (§4.7 step 5).
#[derive(Default)]
struct ProjectActivity {
    confirmed: Vec<CommitmentNotice>,
    consumed: Vec<CommitmentNotice>,
}

impl<'a> ConfirmationScheduler<'a> {
    pub fn new(
        clock: &'a dyn Clock,
        ids: &'a dyn IdSource,
        port: &'a dyn CommitmentStoragePort,
        backend: &'a dyn LiquidBackend,
    ) -> Self {
        Self { clock, ids, port, backend }
    }

    /// Runs one confirmation pass for `location` (§4.7). Returns
    /// `Ok(PassReport::default())` without touching stats or the
    /// transferable cache when there is nothing pending — the
    /// optimization §4.7 step 2 calls for.
    #[instrument(skip(self, behavior), fields(location = %location))]
    pub async fn run_pass(&self, location: &Location, behavior: &CommitmentBehavior) -> Result<PassReport, Error> {
        let pending = self.port.load_pending(location).await?;
        if pending.is_empty() {
            return Ok(PassReport::default());
        }

        let mut stats = self.port.load_allocation_stats(location).await?;
        let offers = self.port.load_transfer_offers(location).await?;
        let mut cache = TransferableCache::new(self.clock, self.ids, offers);
        let state_machine = CommitmentStateMachine::new(self.clock, self.ids);

        let mut activity: BTreeMap<ProjectId, ProjectActivity> = BTreeMap::new();
        let mut confirmed_count = 0usize;
        let mut consumed_offer_count = 0usize;

        for commitment in pending {
            if cache.was_transferred(commitment.id) {
                continue;
            }

            let additions = BTreeMap::from([(commitment.project_id, commitment.amount)]);
            let accepted = can_accept_commitment_changes(&stats, &additions, &BTreeMap::new(), behavior);
            if !accepted {
                continue;
            }

            if self.backend.handles_commitments() {
                let request = CommitmentChangeRequest {
                    transitions: vec![CommitmentTransition {
                        commitment_id: commitment.id,
                        project_id: commitment.project_id,
                        amount: commitment.amount,
                        old_status: commitment.status,
                        new_status: CommitmentStatus::Confirmed,
                        confirm_by: commitment.confirm_by,
                        expires_at: commitment.expires_at,
                    }],
                };
                // A backend rejection or a transport failure is treated the
                // same as an AdmissionPredicate rejection: skip this
                // commitment and move on to the next pending one (§6, §7).
                match self.backend.change_commitments(request).await {
                    Ok(response) if response.accepted() => {}
                    Ok(_) | Err(_) => continue,
                }
            }

            let outcome = cache.check_and_consume(&commitment);
            for superseded in &outcome.superseded_offers {
                self.port.persist_superseded(superseded).await?;
                consumed_offer_count += 1;
                activity
                    .entry(superseded.project_id)
                    .or_default()
                    .consumed
                    .push(CommitmentNotice::from_commitment(superseded));
            }
            for updated in &outcome.updated_offers {
                self.port.persist_offer_update(updated).await?;
            }

            let confirmed = state_machine.confirm(commitment)?;
            self.port.persist_confirmed(&confirmed).await?;
            confirmed_count += 1;

            // Update in-memory stats so later iterations in this pass see
            // the reservation and can't double-spend it (§4.7 step 4).
            let project_stats = stats.projects.entry(confirmed.project_id).or_default();
            project_stats.committed += confirmed.amount;

            let is_transfer_sourced = outcome.consumed_amount > 0;
            let entry = activity.entry(confirmed.project_id).or_default();
            if is_transfer_sourced {
                entry.consumed.push(CommitmentNotice::from_commitment(&confirmed));
            } else {
                entry.confirmed.push(CommitmentNotice::from_commitment(&confirmed));
            }
        }

        let now = self.clock.now();
        let (mail, audit) = build_reports(activity, now);

        info!(
            confirmed = confirmed_count,
            consumed_offers = consumed_offer_count,
            "confirmation pass committed"
        );

        Ok(PassReport {
            confirmed_count,
            consumed_offer_count,
            mail,
            audit,
        })
    }
}

/// Collates per-project activity into at most one mail notification and
/// one audit event per `(project, category)`, applying the dedup rule: a
/// commitment counted under `consumed` is never also reported under
/// `confirmed` (§4.7 step 5).
fn build_reports(
    activity: BTreeMap<ProjectId, ProjectActivity>,
    now: chrono::DateTime<Utc>,
) -> (Vec<MailNotification>, Vec<AuditEvent>) {
    let mut mail = Vec::new();
    let mut audit = Vec::new();

    for (project_id, entry) in activity {
        let consumed_ids: std::collections::HashSet<_> = entry.consumed.iter().map(|n| n.commitment_id).collect();
        let confirmed_only: Vec<_> = entry
            .confirmed
            .into_iter()
            .filter(|n| !consumed_ids.contains(&n.commitment_id))
            .collect();

        if !confirmed_only.is_empty() {
            audit.push(AuditEvent {
                project_id,
                category: AuditCategory::Confirm,
                commitment_ids: confirmed_only.iter().map(|n| n.commitment_id).collect(),
                generated_at: now,
            });
            mail.push(MailNotification {
                project_id,
                category: NotificationCategory::Confirmed,
                commitments: confirmed_only,
                generated_at: now,
            });
        }

        if !entry.consumed.is_empty() {
            audit.push(AuditEvent {
                project_id,
                category: AuditCategory::Consume,
                commitment_ids: entry.consumed.iter().map(|n| n.commitment_id).collect(),
                generated_at: now,
            });
            mail.push(MailNotification {
                project_id,
                category: NotificationCategory::TransferConsumed,
                commitments: entry.consumed,
                generated_at: now,
            });
        }
    }

    (mail, audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use quotaward_core_commitments::{FixedClock, SequentialIdSource};
    use quotaward_domain_models::{
        AvailabilityZone, AzAllocationStats, AzResource, CreationContext,
        CreationReason, ResourceName, ServiceType, TransferStatus,
    };
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::liquid_backend::{CommitmentChangeResponse, NullBackend};

    /// A `LiquidBackend` test double that advertises `HandlesCommitments`
    /// and rejects every proposed change, for exercising the skip path.
    struct AlwaysRejectingBackend;

    #[async_trait]
    impl LiquidBackend for AlwaysRejectingBackend {
        fn handles_commitments(&self) -> bool {
            true
        }

        async fn change_commitments(
            &self,
            _request: CommitmentChangeRequest,
        ) -> Result<CommitmentChangeResponse, Error> {
            Ok(CommitmentChangeResponse {
                rejection_reason: Some("backend at capacity".into()),
                retry_at: None,
            })
        }
    }

    #[derive(Default)]
    struct InMemoryPort {
        pending: Vec<Commitment>,
        stats: AzAllocationStats,
        offers: Vec<Commitment>,
        confirmed: Mutex<Vec<Commitment>>,
        superseded: Mutex<Vec<Commitment>>,
        offer_updates: Mutex<Vec<Commitment>>,
    }

    #[async_trait]
    impl CommitmentStoragePort for InMemoryPort {
        async fn load_pending(&self, _location: &Location) -> Result<Vec<Commitment>, Error> {
            Ok(self.pending.clone())
        }

        async fn load_allocation_stats(&self, _location: &Location) -> Result<AzAllocationStats, Error> {
            Ok(self.stats.clone())
        }

        async fn load_transfer_offers(&self, _location: &Location) -> Result<Vec<Commitment>, Error> {
            Ok(self.offers.clone())
        }

        async fn persist_confirmed(&self, commitment: &Commitment) -> Result<(), Error> {
            self.confirmed.lock().unwrap().push(commitment.clone());
            Ok(())
        }

        async fn persist_superseded(&self, commitment: &Commitment) -> Result<(), Error> {
            self.superseded.lock().unwrap().push(commitment.clone());
            Ok(())
        }

        async fn persist_offer_update(&self, commitment: &Commitment) -> Result<(), Error> {
            self.offer_updates.lock().unwrap().push(commitment.clone());
            Ok(())
        }
    }

    fn pid(n: u128) -> ProjectId {
        ProjectId(Uuid::from_u128(n))
    }

    fn pending_commitment(id: u128, project: u128, amount: u64, created_at: chrono::DateTime<Utc>) -> Commitment {
        Commitment {
            id: Uuid::from_u128(id),
            project_id: pid(project),
            service_type: ServiceType("compute".into()),
            resource_name: ResourceName("cores".into()),
            az: AvailabilityZone::Named("az-one".into()),
            amount,
            duration_seconds: 3600,
            status: CommitmentStatus::Pending,
            transfer_status: TransferStatus::None,
            transfer_token: None,
            creator_uuid: Uuid::from_u128(1),
            creator_name: "alice".into(),
            created_at,
            confirm_by: None,
            confirmed_at: None,
            expires_at: created_at + Duration::days(365),
            superseded_at: None,
            transfer_started_at: None,
            creation_context: CreationContext {
                reason: CreationReason::Create,
                predecessors: vec![],
            },
            supersede_context: None,
        }
    }

    fn location() -> Location {
        Location {
            service_type: ServiceType("compute".into()),
            resource_name: ResourceName("cores".into()),
            az: AvailabilityZone::Named("az-one".into()),
        }
    }

    #[tokio::test]
    async fn confirms_a_pending_commitment_that_fits_capacity() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let port = InMemoryPort {
            pending: vec![pending_commitment(1, 10, 5, created_at)],
            stats: AzAllocationStats {
                az_resource: Some(AzResource::new(100, 1.0)),
                projects: Default::default(),
            },
            ..Default::default()
        };
        let clock = FixedClock::new(created_at + Duration::days(1));
        let ids = SequentialIdSource::default();
        let backend = NullBackend;
        let scheduler = ConfirmationScheduler::new(&clock, &ids, &port, &backend);

        let report = scheduler.run_pass(&location(), &CommitmentBehavior::default()).await.unwrap();
        assert_eq!(report.confirmed_count, 1);
        assert_eq!(port.confirmed.lock().unwrap().len(), 1);
        assert_eq!(report.mail.len(), 1);
        assert_eq!(report.mail[0].category, NotificationCategory::Confirmed);
    }

    #[tokio::test]
    async fn skips_a_commitment_that_would_exceed_capacity() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let port = InMemoryPort {
            pending: vec![pending_commitment(1, 10, 500, created_at)],
            stats: AzAllocationStats {
                az_resource: Some(AzResource::new(100, 1.0)),
                projects: Default::default(),
            },
            ..Default::default()
        };
        let clock = FixedClock::new(created_at);
        let ids = SequentialIdSource::default();
        let backend = NullBackend;
        let scheduler = ConfirmationScheduler::new(&clock, &ids, &port, &backend);

        let report = scheduler.run_pass(&location(), &CommitmentBehavior::default()).await.unwrap();
        assert_eq!(report.confirmed_count, 0);
        assert!(port.confirmed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn returns_early_when_nothing_is_pending() {
        let port = InMemoryPort::default();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let ids = SequentialIdSource::default();
        let backend = NullBackend;
        let scheduler = ConfirmationScheduler::new(&clock, &ids, &port, &backend);

        let report = scheduler.run_pass(&location(), &CommitmentBehavior::default()).await.unwrap();
        assert_eq!(report.confirmed_count, 0);
        assert!(report.mail.is_empty());
    }

    #[tokio::test]
    async fn later_pending_commitments_see_the_earlier_ones_reservation() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let port = InMemoryPort {
            pending: vec![
                pending_commitment(1, 10, 60, created_at),
                pending_commitment(2, 11, 60, created_at + Duration::seconds(1)),
            ],
            stats: AzAllocationStats {
                az_resource: Some(AzResource::new(100, 1.0)),
                projects: Default::default(),
            },
            ..Default::default()
        };
        let clock = FixedClock::new(created_at);
        let ids = SequentialIdSource::default();
        let backend = NullBackend;
        let scheduler = ConfirmationScheduler::new(&clock, &ids, &port, &backend);

        let report = scheduler.run_pass(&location(), &CommitmentBehavior::default()).await.unwrap();
        // First commitment (60) fits fresh capacity of 100. Second (60)
        // would push used capacity to 120 > 100 and is skipped, unless
        // rule (4) lets it through (it shouldn't: it's a brand new project
        // with no prior usage).
        assert_eq!(report.confirmed_count, 1);
        let confirmed = port.confirmed.lock().unwrap();
        assert_eq!(confirmed[0].project_id, pid(10));
    }

    #[tokio::test]
    async fn a_handles_commitments_backend_rejection_skips_the_commitment() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let port = InMemoryPort {
            pending: vec![pending_commitment(1, 10, 5, created_at)],
            stats: AzAllocationStats {
                az_resource: Some(AzResource::new(100, 1.0)),
                projects: Default::default(),
            },
            ..Default::default()
        };
        let clock = FixedClock::new(created_at + Duration::days(1));
        let ids = SequentialIdSource::default();
        let backend = AlwaysRejectingBackend;
        let scheduler = ConfirmationScheduler::new(&clock, &ids, &port, &backend);

        let report = scheduler.run_pass(&location(), &CommitmentBehavior::default()).await.unwrap();
        assert_eq!(report.confirmed_count, 0);
        assert!(port.confirmed.lock().unwrap().is_empty());
        assert!(report.mail.is_empty());
    }
}
