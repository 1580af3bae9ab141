// [libs/core/commitments/src/transferable.rs]
use std::collections::HashSet;

use uuid::Uuid;

use quotaward_domain_models::{Commitment, ProjectId, SupersedeReason};

use crate::clock::{Clock, IdSource};
use crate::state_machine::CommitmentStateMachine;

/// What happened when a pending commitment was checked against the cache
/// of offered commitments for its location (§4.6).
#[derive(Debug, Clone, Default)]
pub struct ConsumptionOutcome {
    /// How much of the incoming commitment's amount was sourced from
    /// offers. `consumed_amount < incoming.amount` means the remainder
    /// still has to come from ordinary capacity admission.
    pub consumed_amount: u64,
    /// Offer records (or the consumed slice of a split offer) that are now
    /// `Superseded` and must be persisted as such.
    pub superseded_offers: Vec<Commitment>,
    /// Leftover records from partial consumption, still `Public` and
    /// reinserted into the cache — also need persisting.
    pub updated_offers: Vec<Commitment>,
}

impl ConsumptionOutcome {
    pub fn fully_satisfied(&self, incoming_amount: u64) -> bool {
        self.consumed_amount >= incoming_amount
    }
}

/// Per-`(service, resource, AZ)` pass-scoped cache of commitments offered
/// for transfer (`TransferStatus::Public`), ordered first-offered-first-
/// consumed. Constructed once per `ConfirmationScheduler` pass; discarded
/// afterwards along with the `AllocationStats` snapshot it runs alongside.
pub struct TransferableCache<'a> {
    state_machine: CommitmentStateMachine<'a>,
    clock: &'a dyn Clock,
    ids: &'a dyn IdSource,
    /// Maintained in consumption order: `(TransferStartedAt, CreatedAt,
    /// ID)`. Vec rather than a priority queue so a partial consumption can
    /// reinsert the leftover "at the same position" per §4.6 step 4.
    offers: Vec<Commitment>,
    /// IDs superseded via consumption this pass, across every call to
    /// `check_and_consume`. Backs `was_transferred`, the guard
    /// `ConfirmationScheduler` uses to avoid confirming a commitment that
    /// was itself consumed as someone else's offer earlier in the pass.
    consumed_ids: HashSet<Uuid>,
}

impl<'a> TransferableCache<'a> {
    /// `offers` must already be filtered to `TransferStatus::Public`,
    /// `Status` not in `{Superseded, Expired}`, for the one `(service,
    /// resource, AZ)` location this pass covers, and sorted by
    /// `(TransferStartedAt, CreatedAt, ID)` as the loader is required to
    /// do (§4.6).
    pub fn new(clock: &'a dyn Clock, ids: &'a dyn IdSource, offers: Vec<Commitment>) -> Self {
        Self {
            state_machine: CommitmentStateMachine::new(clock, ids),
            clock,
            ids,
            offers,
            consumed_ids: HashSet::new(),
        }
    }

    /// Whether `id` was consumed as a transfer offer earlier in this pass.
    /// A commitment that was transferred must not also be confirmed
    /// separately (§4.6, §4.7 step 4).
    pub fn was_transferred(&self, id: Uuid) -> bool {
        self.consumed_ids.contains(&id)
    }

    pub fn offer_count(&self) -> usize {
        self.offers.len()
    }

    /// Tries to source as much of `incoming.amount` as possible from the
    /// cached offers, walking them in order. Offers belonging to
    /// `incoming`'s own project (no self-transfer) or that cannot back
    /// `incoming` for its full duration are skipped without being
    /// consumed. Mutates the cache in place: fully consumed offers are
    /// removed, partially consumed offers are replaced by their leftover.
    pub fn check_and_consume(&mut self, incoming: &Commitment) -> ConsumptionOutcome {
        let mut outcome = ConsumptionOutcome::default();
        let mut index = 0;

        while index < self.offers.len() && outcome.consumed_amount < incoming.amount {
            let skip = {
                let offer = &self.offers[index];
                offer.project_id == incoming.project_id || offer.expires_at > incoming.expires_at
            };
            if skip {
                index += 1;
                continue;
            }

            let missing = incoming.amount - outcome.consumed_amount;
            let offer = self.offers.remove(index);

            if offer.amount <= missing {
                outcome.consumed_amount += offer.amount;
                let superseded = self
                    .state_machine
                    .supersede(offer, SupersedeReason::Consume, vec![incoming.id], Some(incoming.id))
                    .expect("cached offers are always Public and non-terminal");
                self.consumed_ids.insert(superseded.id);
                outcome.superseded_offers.push(superseded);
                // `remove` shifted everything left; `index` now already
                // points at the next candidate.
            } else {
                let (consumed, leftover) = self.split_offer(offer, missing, incoming.id);
                outcome.consumed_amount += missing;
                self.consumed_ids.insert(consumed.id);
                outcome.superseded_offers.push(consumed);
                outcome.updated_offers.push(leftover.clone());
                self.offers.insert(index, leftover);
                index += 1;
            }
        }

        outcome
    }

    /// Splits `offer` into the slice consumed by `incoming` (superseded,
    /// terminal) and the leftover that keeps offering the remainder. The
    /// leftover keeps the original commitment's identity, `TransferStatus`
    /// and `TransferStartedAt` so it reoffers at the same point in the
    /// queue with a fresh token (§4.6 step 4); the consumed slice gets a
    /// fresh ID and carries `CreationContext{Reason:Split}` pointing back
    /// at it, per the amount-conservation property (§8 property 5).
    fn split_offer(&self, offer: Commitment, amount_to_consume: u64, incoming_id: Uuid) -> (Commitment, Commitment) {
        use quotaward_domain_models::{CreationContext, CreationReason, SupersedeContext};

        let now = self.clock.now();
        let leftover_amount = offer.amount - amount_to_consume;

        let mut consumed = offer.clone();
        consumed.id = self.ids.new_commitment_id();
        consumed.amount = amount_to_consume;
        consumed.status = quotaward_domain_models::CommitmentStatus::Superseded;
        consumed.superseded_at = Some(now);
        consumed.supersede_context = Some(SupersedeContext {
            reason: SupersedeReason::Consume,
            successors: vec![incoming_id],
            related_commitment: Some(incoming_id),
        });
        consumed.creation_context = CreationContext {
            reason: CreationReason::Split,
            predecessors: vec![offer.id],
        };
        consumed.transfer_status = quotaward_domain_models::TransferStatus::None;
        consumed.transfer_token = None;
        consumed.transfer_started_at = None;

        let mut leftover = offer;
        leftover.amount = leftover_amount;
        leftover.transfer_token = Some(self.ids.new_transfer_token());

        (consumed, leftover)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, SequentialIdSource};
    use chrono::{Duration, TimeZone, Utc};
    use quotaward_domain_models::{
        AvailabilityZone, CommitmentStatus, CreationContext, CreationReason, ResourceName,
        ServiceType, TransferStatus,
    };

    fn base_offer(id: u128, project: u128, amount: u64, expires_at: chrono::DateTime<Utc>) -> Commitment {
        Commitment {
            id: Uuid::from_u128(id),
            project_id: ProjectId(Uuid::from_u128(project)),
            service_type: ServiceType("compute".into()),
            resource_name: ResourceName("cores".into()),
            az: AvailabilityZone::Named("az-one".into()),
            amount,
            duration_seconds: 3600,
            status: CommitmentStatus::Confirmed,
            transfer_status: TransferStatus::Public,
            transfer_token: Some("token".into()),
            creator_uuid: Uuid::from_u128(999),
            creator_name: "alice".into(),
            created_at: expires_at - Duration::days(30),
            confirm_by: None,
            confirmed_at: Some(expires_at - Duration::days(30)),
            expires_at,
            superseded_at: None,
            transfer_started_at: Some(expires_at - Duration::days(30)),
            creation_context: CreationContext {
                reason: CreationReason::Create,
                predecessors: vec![],
            },
            supersede_context: None,
        }
    }

    fn incoming(id: u128, project: u128, amount: u64, expires_at: chrono::DateTime<Utc>) -> Commitment {
        let mut c = base_offer(id, project, amount, expires_at);
        c.status = CommitmentStatus::Pending;
        c.transfer_status = TransferStatus::None;
        c.transfer_token = None;
        c.transfer_started_at = None;
        c
    }

    #[test]
    fn scenario_d_consumes_in_offer_order_with_split_leftover() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = t1 + Duration::days(10);

        let o1 = base_offer(1, 10, 4, t1);
        let o2 = base_offer(2, 11, 9, t1);
        let p = incoming(3, 12, 10, t2);

        let clock = FixedClock::new(t1 + Duration::days(1));
        let ids = SequentialIdSource::starting_at(1000);
        let mut cache = TransferableCache::new(&clock, &ids, vec![o1, o2]);

        let outcome = cache.check_and_consume(&p);

        assert_eq!(outcome.consumed_amount, 10);
        assert!(outcome.fully_satisfied(p.amount));
        assert_eq!(outcome.superseded_offers.len(), 2);

        let o1_result = outcome
            .superseded_offers
            .iter()
            .find(|c| c.id == Uuid::from_u128(1))
            .unwrap();
        assert_eq!(o1_result.amount, 4);
        assert_eq!(o1_result.status, CommitmentStatus::Superseded);
        assert_eq!(
            o1_result.supersede_context.as_ref().unwrap().related_commitment,
            Some(p.id)
        );

        // o2 (amount 9) only needed to supply the remaining 6: split into a
        // consumed part of 6 and a leftover of 3, still offered.
        let o2_consumed = outcome
            .superseded_offers
            .iter()
            .find(|c| c.creation_context.predecessors == vec![Uuid::from_u128(2)])
            .unwrap();
        assert_eq!(o2_consumed.amount, 6);
        assert_eq!(o2_consumed.status, CommitmentStatus::Superseded);

        assert_eq!(outcome.updated_offers.len(), 1);
        let leftover = &outcome.updated_offers[0];
        assert_eq!(leftover.id, Uuid::from_u128(2));
        assert_eq!(leftover.amount, 3);
        assert_eq!(leftover.transfer_status, TransferStatus::Public);
        assert_ne!(leftover.transfer_token, Some("token".into()));

        assert!(cache.was_transferred(Uuid::from_u128(1)));
    }

    #[test]
    fn skips_offers_from_the_same_project_no_self_transfer() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = t1 + Duration::days(5);
        let own_offer = base_offer(1, 12, 10, t1);
        let p = incoming(2, 12, 10, t2);

        let clock = FixedClock::new(t1);
        let ids = SequentialIdSource::default();
        let mut cache = TransferableCache::new(&clock, &ids, vec![own_offer]);

        let outcome = cache.check_and_consume(&p);
        assert_eq!(outcome.consumed_amount, 0);
        assert!(outcome.superseded_offers.is_empty());
    }

    #[test]
    fn skips_offers_that_expire_after_the_incoming_commitment() {
        // Scenario D's rationale: an offer that would still be Public
        // after `incoming` expires is fine to consume (T1 < T2 works in
        // the scenario above); an offer that outlasts `incoming` even
        // further is simply never needed past incoming's own window, but
        // per §4.6(b) offers whose own expiry is *later* than incoming's
        // are explicitly skipped rather than consumed.
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let short = t1 + Duration::days(1);
        let long_offer = base_offer(1, 10, 10, t1 + Duration::days(30));
        let p = incoming(2, 11, 10, short);

        let clock = FixedClock::new(t1);
        let ids = SequentialIdSource::default();
        let mut cache = TransferableCache::new(&clock, &ids, vec![long_offer]);

        let outcome = cache.check_and_consume(&p);
        assert_eq!(outcome.consumed_amount, 0);
    }

    #[test]
    fn partial_consumption_preserves_total_amount() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let offer = base_offer(1, 10, 9, t1);
        let p = incoming(2, 11, 6, t1);

        let clock = FixedClock::new(t1);
        let ids = SequentialIdSource::starting_at(500);
        let mut cache = TransferableCache::new(&clock, &ids, vec![offer]);

        let outcome = cache.check_and_consume(&p);
        let consumed_total: u64 = outcome.superseded_offers.iter().map(|c| c.amount).sum();
        let leftover_total: u64 = outcome.updated_offers.iter().map(|c| c.amount).sum();
        assert_eq!(consumed_total + leftover_total, 9);
    }
}
