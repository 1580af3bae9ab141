// [libs/core/admission/src/admission.rs]
use quotaward_domain_models::{AzAllocationStats, CommitmentBehavior, ProjectId};
use std::collections::BTreeMap;

/// Decides whether a proposed delta of confirmed-commitment amounts fits
/// within a cluster's capacity.
///
/// `additions` and `subtractions` are per-project deltas to each project's
/// `Committed` figure; a project absent from `stats.projects` but present
/// in `additions` is treated as a brand-new committer starting from zero.
///
/// Rule (4) always permits subtractions, and permits additions that keep a
/// project within its own pre-existing usage — the "commit what you
/// already use" loophole is intentional. Rule (5)
/// enforces the operator-chosen commitability threshold only once the
/// envelope would otherwise worsen.
pub fn can_accept_commitment_changes(
    stats: &AzAllocationStats,
    additions: &BTreeMap<ProjectId, u64>,
    subtractions: &BTreeMap<ProjectId, u64>,
    behavior: &CommitmentBehavior,
) -> bool {
    let used_before = stats.used_capacity();

    let mut touched: Vec<&ProjectId> = stats.projects.keys().collect();
    for id in additions.keys().chain(subtractions.keys()) {
        if !stats.projects.contains_key(id) && !touched.contains(&id) {
            touched.push(id);
        }
    }

    let used_after: u64 = touched
        .into_iter()
        .map(|project_id| {
            let current = stats.projects.get(project_id).copied().unwrap_or_default();
            let addition = additions.get(project_id).copied().unwrap_or(0);
            let subtraction = subtractions.get(project_id).copied().unwrap_or(0);
            let committed_after = current
                .committed
                .saturating_add(addition)
                .saturating_sub(subtraction);
            committed_after.max(current.usage)
        })
        .sum();

    if used_after <= used_before {
        return true;
    }

    let committable_capacity = match behavior.until_percent {
        Some(until_percent) => {
            ((stats.capacity() as f64) * (until_percent / 100.0)).floor() as u64
        }
        None => stats.capacity(),
    };

    used_after <= committable_capacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotaward_domain_models::{AzResource, ProjectAzAllocationStats};

    fn stats(capacity: u64, entries: &[(u32, u64, u64)]) -> AzAllocationStats {
        let mut s = AzAllocationStats {
            az_resource: Some(AzResource::new(capacity, 1.0)),
            projects: Default::default(),
        };
        for &(id, committed, usage) in entries {
            s.projects.insert(
                ProjectId(uuid::Uuid::from_u128(id as u128)),
                ProjectAzAllocationStats {
                    usage,
                    committed,
                    min_historical_usage: usage,
                    max_historical_usage: usage,
                },
            );
        }
        s
    }

    fn pid(id: u32) -> ProjectId {
        ProjectId(uuid::Uuid::from_u128(id as u128))
    }

    #[test]
    fn scenario_e_commit_existing_usage_is_accepted_past_capacity() {
        let stats = stats(20, &[(2, 5, 10)]);
        let additions = BTreeMap::from([(pid(2), 5)]);
        let subtractions = BTreeMap::new();
        assert!(can_accept_commitment_changes(
            &stats,
            &additions,
            &subtractions,
            &CommitmentBehavior::default()
        ));
    }

    #[test]
    fn additions_beyond_usage_are_rejected_past_the_commitable_threshold() {
        let stats = stats(20, &[(1, 0, 0)]);
        let additions = BTreeMap::from([(pid(1), 21)]);
        let subtractions = BTreeMap::new();
        assert!(!can_accept_commitment_changes(
            &stats,
            &additions,
            &subtractions,
            &CommitmentBehavior::default()
        ));
    }

    #[test]
    fn until_percent_lowers_the_commitable_threshold() {
        let stats = stats(100, &[(1, 0, 0)]);
        let additions = BTreeMap::from([(pid(1), 60)]);
        let subtractions = BTreeMap::new();
        let behavior = CommitmentBehavior {
            until_percent: Some(50.0),
        };
        assert!(!can_accept_commitment_changes(
            &stats,
            &additions,
            &subtractions,
            &behavior
        ));

        let behavior = CommitmentBehavior {
            until_percent: Some(70.0),
        };
        assert!(can_accept_commitment_changes(
            &stats,
            &additions,
            &subtractions,
            &behavior
        ));
    }

    #[test]
    fn subtractions_are_always_accepted() {
        let stats = stats(10, &[(1, 50, 0)]);
        let additions = BTreeMap::new();
        let subtractions = BTreeMap::from([(pid(1), 50)]);
        assert!(can_accept_commitment_changes(
            &stats,
            &additions,
            &subtractions,
            &CommitmentBehavior::default()
        ));
    }

    proptest::proptest! {
        /// Monotonicity: if a change is accepted,
        /// the same change with smaller additions or larger subtractions
        /// is accepted too.
        #[test]
        fn monotonicity(
            capacity in 0u64..1000,
            committed in 0u64..1000,
            usage in 0u64..1000,
            addition in 0u64..1000,
            smaller_addition in 0u64..1000,
            subtraction in 0u64..1000,
            larger_subtraction in 0u64..1000,
        ) {
            let smaller_addition = smaller_addition.min(addition);
            let larger_subtraction = larger_subtraction.max(subtraction);

            let stats = stats(capacity, &[(1, committed, usage)]);
            let behavior = CommitmentBehavior::default();

            let accepted = can_accept_commitment_changes(
                &stats,
                &BTreeMap::from([(pid(1), addition)]),
                &BTreeMap::from([(pid(1), subtraction)]),
                &behavior,
            );

            if accepted {
                let still_accepted = can_accept_commitment_changes(
                    &stats,
                    &BTreeMap::from([(pid(1), smaller_addition)]),
                    &BTreeMap::from([(pid(1), larger_subtraction)]),
                    &behavior,
                );
                proptest::prop_assert!(still_accepted);
            }
        }
    }
}
