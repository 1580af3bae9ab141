// [libs/core/quota-distributor/src/distribute.rs]
use quotaward_core_admission::distribute_fairly;
use quotaward_domain_models::{
    AllocationStats, AutogrowConfig, AvailabilityZone, LocalQuotaConstraints, ProjectId, Topology,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::overcommit::{compute_overcommit_permissions, OvercommitPermission};

#[derive(Debug, Clone, Copy)]
pub struct ResourceQuotaInfo {
    pub topology: Topology,
    pub has_quota: bool,
}

/// The result of one distribution run for a single `(ServiceType,
/// ResourceName)`: `Allocated` quota per AZ per project, plus the
/// base-overcommit permission per AZ (exposed for callers that want to
/// surface it, e.g. as a diagnostic on the cluster resource).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaDistributionResult {
    pub allocated: BTreeMap<AvailabilityZone, BTreeMap<ProjectId, u64>>,
    pub allows_quota_overcommit: BTreeMap<AvailabilityZone, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionKind {
    Base,
    Growth,
}

/// Runs all four phases for one resource and returns the resulting
/// `Allocated` grid.
///
/// Phases only ever raise `Allocated`; nothing downstream of phase 1 can
/// take quota away from a project. `constraints` is sparse — a project
/// without an entry has no min/max override and is left to the ordinary
/// phases.
pub fn distribute_quota(
    stats: &AllocationStats,
    autogrow: &AutogrowConfig,
    resource: ResourceQuotaInfo,
    constraints: &BTreeMap<ProjectId, LocalQuotaConstraints>,
) -> QuotaDistributionResult {
    if !resource.has_quota {
        return QuotaDistributionResult::default();
    }

    let permissions = compute_overcommit_permissions(stats, autogrow);
    let mut grid = Grid::new(stats, autogrow.project_base_quota, resource.topology);

    // Phase 1: hard minimum. Nothing already in use is ever taken away.
    grid.apply_hard_minimum(stats);

    // Phase 2: soft minimum. Grow up to each project's own historical peak.
    grid.set_desired_soft_minimum(stats);
    grid.enforce_max_quota(constraints);
    grid.try_fulfill_desired(&permissions, PermissionKind::Base);
    grid.enforce_min_quota(constraints);

    // Phase 3: growth. Project quota forward from its growth baseline.
    grid.set_desired_growth(stats, autogrow);
    grid.enforce_max_quota(constraints);
    grid.try_fulfill_desired(&permissions, PermissionKind::Growth);
    grid.enforce_min_quota(constraints);

    // Phase 4: base quota. Every project is entitled to a floor, topped up
    // from whichever pool the resource's topology routes it through.
    grid.set_desired_base_quota(resource.topology);
    grid.enforce_max_quota(constraints);
    grid.try_fulfill_desired(&permissions, PermissionKind::Base);
    grid.enforce_min_quota(constraints);

    let allows_quota_overcommit = permissions.iter().map(|(az, p)| (az.clone(), p.base)).collect();

    QuotaDistributionResult {
        allocated: grid.allocated,
        allows_quota_overcommit,
    }
}

/// Working state for one distribution run: capacity and the evolving
/// `Allocated`/`Desired` grids, keyed by AZ then project.
struct Grid {
    relevant_azs: Vec<AvailabilityZone>,
    real_azs: Vec<AvailabilityZone>,
    known_projects: BTreeSet<ProjectId>,
    capacity: BTreeMap<AvailabilityZone, u64>,
    allocated: BTreeMap<AvailabilityZone, BTreeMap<ProjectId, u64>>,
    desired: BTreeMap<AvailabilityZone, BTreeMap<ProjectId, u64>>,
    project_base_quota: u64,
}

impl Grid {
    fn new(stats: &AllocationStats, project_base_quota: u64, topology: Topology) -> Self {
        let mut relevant: BTreeSet<AvailabilityZone> = stats.by_az.keys().cloned().collect();
        if project_base_quota > 0 && topology != Topology::AzSeparated {
            relevant.insert(AvailabilityZone::Any);
        }

        let known_projects: BTreeSet<ProjectId> = stats
            .by_az
            .values()
            .flat_map(|az_stats| az_stats.projects.keys().cloned())
            .collect();

        let capacity: BTreeMap<AvailabilityZone, u64> = relevant
            .iter()
            .map(|az| (az.clone(), stats.az(az).map(|s| s.capacity()).unwrap_or(0)))
            .collect();

        let real_azs: Vec<AvailabilityZone> = relevant.iter().filter(|az| az.is_real()).cloned().collect();
        let relevant_azs: Vec<AvailabilityZone> = relevant.into_iter().collect();

        let allocated = relevant_azs.iter().map(|az| (az.clone(), BTreeMap::new())).collect();
        let desired = relevant_azs.iter().map(|az| (az.clone(), BTreeMap::new())).collect();

        Self {
            relevant_azs,
            real_azs,
            known_projects,
            capacity,
            allocated,
            desired,
            project_base_quota,
        }
    }

    fn allocated_of(&self, az: &AvailabilityZone, project: &ProjectId) -> u64 {
        self.allocated.get(az).and_then(|m| m.get(project)).copied().unwrap_or(0)
    }

    fn desired_of(&self, az: &AvailabilityZone, project: &ProjectId) -> u64 {
        self.desired.get(az).and_then(|m| m.get(project)).copied().unwrap_or(0)
    }

    fn set_allocated(&mut self, az: &AvailabilityZone, project: &ProjectId, amount: u64) {
        self.allocated.entry(az.clone()).or_default().insert(*project, amount);
    }

    fn add_allocated(&mut self, az: &AvailabilityZone, project: &ProjectId, amount: u64) {
        if amount == 0 {
            return;
        }
        *self.allocated.entry(az.clone()).or_default().entry(*project).or_insert(0) += amount;
    }

    fn set_desired(&mut self, az: &AvailabilityZone, project: &ProjectId, amount: u64) {
        self.desired.entry(az.clone()).or_default().insert(*project, amount);
    }

    fn apply_hard_minimum(&mut self, stats: &AllocationStats) {
        for az in self.relevant_azs.clone() {
            let Some(az_stats) = stats.az(&az) else { continue };
            for (project, p) in &az_stats.projects {
                self.set_allocated(&az, project, p.committed.max(p.usage));
            }
        }
    }

    fn set_desired_soft_minimum(&mut self, stats: &AllocationStats) {
        for az in self.relevant_azs.clone() {
            let Some(az_stats) = stats.az(&az) else { continue };
            for (project, p) in &az_stats.projects {
                self.set_desired(&az, project, p.max_historical_usage);
            }
        }
    }

    fn set_desired_growth(&mut self, stats: &AllocationStats, autogrow: &AutogrowConfig) {
        for az in self.relevant_azs.clone() {
            let Some(az_stats) = stats.az(&az) else { continue };
            for (project, p) in &az_stats.projects {
                let baseline = p.committed.max(p.min_historical_usage);
                let mut target = ((baseline as f64) * autogrow.growth_multiplier).floor() as u64;
                if autogrow.growth_multiplier > 1.0 && baseline > 0 {
                    let minimum_step = autogrow.growth_minimum.max(1);
                    target = target.max(baseline.saturating_add(minimum_step));
                }
                self.set_desired(&az, project, target);
            }
        }
    }

    /// Every project is owed `ProjectBaseQuota` across its real AZs.
    /// `AzSeparated` resources owe it independently in every real AZ (no
    /// shared pool to borrow against); every other topology tops the
    /// project up through `any`.
    fn set_desired_base_quota(&mut self, topology: Topology) {
        if self.project_base_quota == 0 {
            return;
        }

        for project in self.known_projects.clone() {
            let already_held: u64 = self.real_azs.iter().map(|az| self.allocated_of(az, &project)).sum();
            if already_held >= self.project_base_quota {
                continue;
            }

            if topology == Topology::AzSeparated {
                for az in self.real_azs.clone() {
                    self.set_desired(&az, &project, self.project_base_quota);
                }
            } else if self.relevant_azs.contains(&AvailabilityZone::Any) {
                self.set_desired(&AvailabilityZone::Any, &project, self.project_base_quota - already_held);
            }
        }
    }

    fn enforce_max_quota(&mut self, constraints: &BTreeMap<ProjectId, LocalQuotaConstraints>) {
        for (project, constraint) in constraints {
            let Some(max_quota) = constraint.max_quota else { continue };

            let total_claim: u64 = self
                .relevant_azs
                .iter()
                .map(|az| self.allocated_of(az, project).max(self.desired_of(az, project)))
                .sum();
            if total_claim <= max_quota {
                continue;
            }

            let total_allocated: u64 = self.relevant_azs.iter().map(|az| self.allocated_of(az, project)).sum();
            let available_for_growth = max_quota.saturating_sub(total_allocated);

            let requested: BTreeMap<AvailabilityZone, u64> = self
                .relevant_azs
                .iter()
                .map(|az| {
                    let gap = self.desired_of(az, project).saturating_sub(self.allocated_of(az, project));
                    (az.clone(), gap)
                })
                .collect();
            let shares = distribute_fairly(available_for_growth, &requested);

            for az in self.relevant_azs.clone() {
                let new_desired = self.allocated_of(&az, project) + shares.get(&az).copied().unwrap_or(0);
                self.set_desired(&az, project, new_desired);
            }
        }
    }

    fn enforce_min_quota(&mut self, constraints: &BTreeMap<ProjectId, LocalQuotaConstraints>) {
        for (project, constraint) in constraints {
            let Some(min_quota) = constraint.min_quota else { continue };

            let sum_allocated: u64 = self.real_azs.iter().map(|az| self.allocated_of(az, project)).sum();
            if sum_allocated >= min_quota {
                continue;
            }
            let mut missing = min_quota - sum_allocated;

            let requested: BTreeMap<AvailabilityZone, u64> = self
                .real_azs
                .iter()
                .map(|az| {
                    let gap = self.desired_of(az, project).saturating_sub(self.allocated_of(az, project));
                    let capped = gap.min(self.capacity.get(az).copied().unwrap_or(0));
                    (az.clone(), capped)
                })
                .collect();
            let requested = if requested.values().sum::<u64>() == 0 {
                self.real_azs.iter().map(|az| (az.clone(), min_quota)).collect()
            } else {
                requested
            };

            let first_pass = distribute_fairly(missing, &requested);
            for (az, amount) in &first_pass {
                self.add_allocated(az, project, *amount);
            }
            missing = missing.saturating_sub(first_pass.values().sum());

            if missing > 0 {
                let second_pass = distribute_uncapped_by_weight(missing, &self.capacity_weights());
                for (az, amount) in &second_pass {
                    self.add_allocated(az, project, *amount);
                }
            }
        }
    }

    fn capacity_weights(&self) -> BTreeMap<AvailabilityZone, u64> {
        self.real_azs.iter().map(|az| (az.clone(), self.capacity.get(az).copied().unwrap_or(0))).collect()
    }

    fn try_fulfill_desired(&mut self, permissions: &BTreeMap<AvailabilityZone, OvercommitPermission>, kind: PermissionKind) {
        // Step 1: AZs that are free to overcommit get their full request,
        // regardless of capacity.
        for az in self.relevant_azs.clone() {
            let allowed = permissions
                .get(&az)
                .map(|p| match kind {
                    PermissionKind::Base => p.base,
                    PermissionKind::Growth => p.growth,
                })
                .unwrap_or(false);
            if !allowed {
                continue;
            }
            let projects: Vec<ProjectId> = self.desired.get(&az).map(|m| m.keys().copied().collect()).unwrap_or_default();
            for project in projects {
                let desired = self.desired_of(&az, &project);
                if desired > self.allocated_of(&az, &project) {
                    self.set_allocated(&az, &project, desired);
                }
            }
        }

        // Step 2: whatever capacity remains in each real AZ is handed out
        // fairly to its still-outstanding requests.
        for az in self.real_azs.clone() {
            let capacity = self.capacity.get(&az).copied().unwrap_or(0);
            let used: u64 = self.allocated.get(&az).map(|m| m.values().sum()).unwrap_or(0);
            let available = capacity.saturating_sub(used);

            let requested: BTreeMap<ProjectId, u64> = self
                .desired
                .get(&az)
                .map(|m| {
                    m.iter()
                        .filter_map(|(project, &desired)| {
                            let gap = desired.saturating_sub(self.allocated_of(&az, project));
                            (gap > 0).then_some((*project, gap))
                        })
                        .collect()
                })
                .unwrap_or_default();
            let shares = distribute_fairly(available, &requested);
            for (project, amount) in shares {
                self.add_allocated(&az, &project, amount);
            }
        }

        // Step 3: leftover capacity across every relevant AZ is pooled and
        // handed to `any`'s still-outstanding requests.
        if self.relevant_azs.contains(&AvailabilityZone::Any) {
            let total_available: u64 = self
                .relevant_azs
                .iter()
                .map(|az| {
                    let capacity = self.capacity.get(az).copied().unwrap_or(0);
                    let used: u64 = self.allocated.get(az).map(|m| m.values().sum()).unwrap_or(0);
                    capacity.saturating_sub(used)
                })
                .sum();

            let requested: BTreeMap<ProjectId, u64> = self
                .desired
                .get(&AvailabilityZone::Any)
                .map(|m| {
                    m.iter()
                        .filter_map(|(project, &desired)| {
                            let gap = desired.saturating_sub(self.allocated_of(&AvailabilityZone::Any, project));
                            (gap > 0).then_some((*project, gap))
                        })
                        .collect()
                })
                .unwrap_or_default();
            let shares = distribute_fairly(total_available, &requested);
            for (project, amount) in shares {
                self.add_allocated(&AvailabilityZone::Any, &project, amount);
            }
        }
    }
}

/// Splits `total` across `weights` proportionally, largest-remainder
/// rounding, with no per-key cap at its own weight.
///
/// Unlike `distribute_fairly`, this always places the full `total` as long
/// as some weight is nonzero — §4.4.1 MinQuota's second pass needs a
/// project's remaining shortfall pushed into AZs past their capacity,
/// which `distribute_fairly`'s "never exceed what was asked" contract
/// can't express when the weight itself *is* the capacity. When every
/// weight is zero (no AZ has any capacity at all), nothing is placed.
fn distribute_uncapped_by_weight(total: u64, weights: &BTreeMap<AvailabilityZone, u64>) -> BTreeMap<AvailabilityZone, u64> {
    let sum_weights: u64 = weights.values().sum();
    if sum_weights == 0 {
        return weights.keys().map(|az| (az.clone(), 0)).collect();
    }

    let mut output: BTreeMap<AvailabilityZone, u64> = BTreeMap::new();
    let mut remainders: Vec<(AvailabilityZone, f64)> = Vec::with_capacity(weights.len());

    for (az, &weight) in weights {
        let exact = (total as f64) * (weight as f64) / (sum_weights as f64);
        let floor_share = exact.floor() as u64;
        output.insert(az.clone(), floor_share);
        remainders.push((az.clone(), exact - floor_share as f64));
    }

    let distributed: u64 = output.values().sum();
    let mut remaining = total.saturating_sub(distributed);

    remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (az, _) in remainders {
        if remaining == 0 {
            break;
        }
        *output.get_mut(&az).expect("key inserted above") += 1;
        remaining -= 1;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotaward_domain_models::{AzAllocationStats, AzResource, ServiceType, ResourceName};
    use uuid::Uuid;

    fn pid(n: u128) -> ProjectId {
        ProjectId(Uuid::from_u128(n))
    }

    fn stats_single_az(az: AvailabilityZone, capacity: u64, projects: &[(ProjectId, u64, u64, u64, u64)]) -> AllocationStats {
        let mut stats = AllocationStats::new(ServiceType("compute".into()), ResourceName("cores".into()));
        let az_stats = stats.az_mut(&az);
        az_stats.az_resource = Some(AzResource::new(capacity, 1.0));
        for &(project, usage, committed, min_historical_usage, max_historical_usage) in projects {
            az_stats.projects.insert(
                project,
                ProjectAzAllocationStats { usage, committed, min_historical_usage, max_historical_usage },
            );
        }
        stats
    }

    /// spec.md §8 Scenario A — basic non-AZ-aware autogrow.
    #[test]
    fn scenario_a_basic_non_az_aware_autogrow() {
        let stats = stats_single_az(
            AvailabilityZone::Any,
            250,
            &[
                (pid(401), 30, 0, 30, 30),
                (pid(402), 50, 0, 45, 50),
                (pid(403), 0, 0, 0, 20),
                (pid(404), 10, 60, 8, 12),
                (pid(405), 0, 0, 0, 0),
                (pid(406), 2, 0, 2, 2),
            ],
        );
        let autogrow = AutogrowConfig {
            growth_multiplier: 1.2,
            growth_minimum: 0,
            project_base_quota: 10,
            allow_quota_overcommit_until_allocated_percent: 0.0,
        };
        let result = distribute_quota(
            &stats,
            &autogrow,
            ResourceQuotaInfo { topology: Topology::Flat, has_quota: true },
            &BTreeMap::new(),
        );
        let any = &result.allocated[&AvailabilityZone::Any];
        assert_eq!(any[&pid(401)], 36);
        assert_eq!(any[&pid(402)], 54);
        assert_eq!(any[&pid(403)], 20);
        assert_eq!(any[&pid(404)], 72);
        assert_eq!(any[&pid(405)], 10);
        assert_eq!(any[&pid(406)], 10);
    }

    /// spec.md §8 Scenario B — capacity bottleneck tiers. Same project shape,
    /// run against four shrinking capacities.
    #[test]
    fn scenario_b_capacity_bottleneck_tiers() {
        let autogrow = AutogrowConfig {
            growth_multiplier: 1.8,
            growth_minimum: 0,
            project_base_quota: 10,
            allow_quota_overcommit_until_allocated_percent: 0.0,
        };
        let az = AvailabilityZone::Named("az-one".into());
        let run = |capacity: u64| {
            let stats = stats_single_az(
                az.clone(),
                capacity,
                &[
                    (pid(401), 20, 0, 20, 20),
                    (pid(402), 50, 0, 50, 70),
                    (pid(403), 0, 0, 0, 0),
                    (pid(404), 0, 0, 0, 0),
                    (pid(405), 0, 0, 0, 0),
                ],
            );
            distribute_quota(
                &stats,
                &autogrow,
                ResourceQuotaInfo { topology: Topology::AzAware, has_quota: true },
                &BTreeMap::new(),
            )
        };

        let at = |result: &QuotaDistributionResult, zone: &AvailabilityZone, project: ProjectId| {
            result.allocated.get(zone).and_then(|m| m.get(&project)).copied().unwrap_or(0)
        };

        let result = run(141);
        assert_eq!(at(&result, &az, pid(401)), 36);
        assert_eq!(at(&result, &az, pid(402)), 90);
        assert_eq!(at(&result, &az, pid(403)), 5);
        assert_eq!(at(&result, &az, pid(404)), 5);
        assert_eq!(at(&result, &az, pid(405)), 5);

        let result = run(100);
        assert_eq!(at(&result, &az, pid(401)), 24);
        assert_eq!(at(&result, &az, pid(402)), 76);
        assert_eq!(at(&result, &az, pid(403)), 0);
        assert_eq!(at(&result, &az, pid(404)), 0);
        assert_eq!(at(&result, &az, pid(405)), 0);

        let result = run(80);
        assert_eq!(at(&result, &az, pid(401)), 20);
        assert_eq!(at(&result, &az, pid(402)), 60);
        assert_eq!(at(&result, &az, pid(403)), 0);

        let result = run(20);
        assert_eq!(at(&result, &az, pid(401)), 20);
        assert_eq!(at(&result, &az, pid(402)), 50);
        assert_eq!(at(&result, &az, pid(403)), 0);
    }

    /// spec.md §8 Scenario C — MinQuota override with tight capacity.
    #[test]
    fn scenario_c_min_quota_override_with_tight_capacity() {
        let mut stats = AllocationStats::new(ServiceType("compute".into()), ResourceName("cores".into()));
        let az_one = stats.az_mut(&AvailabilityZone::Named("az-one".into()));
        az_one.az_resource = Some(AzResource::new(10000, 1.0));
        az_one.projects.insert(pid(401), ProjectAzAllocationStats::constant_usage(20));
        az_one.projects.insert(pid(402), ProjectAzAllocationStats::constant_usage(20));

        let az_two = stats.az_mut(&AvailabilityZone::Named("az-two".into()));
        az_two.az_resource = Some(AzResource::new(200, 1.0));
        az_two.projects.insert(
            pid(401),
            ProjectAzAllocationStats { usage: 40, committed: 0, min_historical_usage: 20, max_historical_usage: 40 },
        );
        az_two.projects.insert(
            pid(402),
            ProjectAzAllocationStats { usage: 40, committed: 0, min_historical_usage: 40, max_historical_usage: 60 },
        );

        let autogrow = AutogrowConfig {
            growth_multiplier: 1.2,
            growth_minimum: 0,
            project_base_quota: 100,
            allow_quota_overcommit_until_allocated_percent: 0.0,
        };
        let constraints = BTreeMap::from([
            (pid(401), LocalQuotaConstraints { min_quota: Some(200), max_quota: None }),
            (pid(402), LocalQuotaConstraints { min_quota: Some(80), max_quota: None }),
        ]);

        let result = distribute_quota(
            &stats,
            &autogrow,
            ResourceQuotaInfo { topology: Topology::AzAware, has_quota: true },
            &constraints,
        );

        let at = |zone: &AvailabilityZone, project: ProjectId| {
            result.allocated.get(zone).and_then(|m| m.get(&project)).copied().unwrap_or(0)
        };
        let az_one = AvailabilityZone::Named("az-one".into());
        let az_two = AvailabilityZone::Named("az-two".into());

        assert_eq!(at(&az_one, pid(401)), 90);
        assert_eq!(at(&az_one, pid(402)), 24);
        assert_eq!(at(&az_two, pid(401)), 110);
        assert_eq!(at(&az_two, pid(402)), 60);
        assert_eq!(at(&AvailabilityZone::Any, pid(401)), 0);
        assert_eq!(at(&AvailabilityZone::Any, pid(402)), 16);
    }

    /// spec.md §4.4.1 / §8 testable property 2 — MinQuota wins over
    /// capacity safety. A project's historical usage sits entirely in
    /// az-one, so the soft-minimum phase can only place desired quota
    /// there; once both AZs' capacity is exhausted, MinQuota's shortfall
    /// must still land somewhere, even past each AZ's own `Capacity`.
    #[test]
    fn min_quota_is_reached_even_when_it_exceeds_every_azs_capacity() {
        let mut stats = AllocationStats::new(ServiceType("compute".into()), ResourceName("cores".into()));
        let az_one = stats.az_mut(&AvailabilityZone::Named("az-one".into()));
        az_one.az_resource = Some(AzResource::new(100, 1.0));
        az_one.projects.insert(
            pid(401),
            ProjectAzAllocationStats { usage: 0, committed: 0, min_historical_usage: 0, max_historical_usage: 1000 },
        );
        stats.az_mut(&AvailabilityZone::Named("az-two".into())).az_resource = Some(AzResource::new(100, 1.0));

        let autogrow = AutogrowConfig {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 0,
            allow_quota_overcommit_until_allocated_percent: 0.0,
        };
        let constraints = BTreeMap::from([(pid(401), LocalQuotaConstraints { min_quota: Some(500), max_quota: None })]);

        let result = distribute_quota(
            &stats,
            &autogrow,
            ResourceQuotaInfo { topology: Topology::AzAware, has_quota: true },
            &constraints,
        );

        let az_one = AvailabilityZone::Named("az-one".into());
        let az_two = AvailabilityZone::Named("az-two".into());
        let allocated_az_one = result.allocated[&az_one][&pid(401)];
        let allocated_az_two = result.allocated[&az_two][&pid(401)];

        assert_eq!(allocated_az_one + allocated_az_two, 500);
        // Neither AZ's 100-unit capacity bounds this split: MinQuota wins.
        assert!(allocated_az_one > 100);
        assert!(allocated_az_two > 100);
    }

    /// spec.md §8 Scenario F — a zero-capacity AZ that has never carried
    /// capacity (still building out) does not block the base-quota phase's
    /// overcommit into `any`; one that has carried capacity before and still
    /// shows usage (decommissioned mid-drain) does.
    fn scenario_f_stats(az_two_ever_had_capacity: bool, az_two_usage: u64) -> AllocationStats {
        let mut stats = AllocationStats::new(ServiceType("compute".into()), ResourceName("cores".into()));

        let az_one = stats.az_mut(&AvailabilityZone::Named("az-one".into()));
        az_one.az_resource = Some(AzResource::new(15, 1.0));
        az_one.projects.insert(pid(401), ProjectAzAllocationStats::constant_usage(15));

        let az_three = stats.az_mut(&AvailabilityZone::Named("az-three".into()));
        az_three.az_resource = Some(AzResource::new(14, 1.0));
        az_three.projects.insert(pid(401), ProjectAzAllocationStats::constant_usage(14));
        az_three.projects.insert(pid(404), ProjectAzAllocationStats::default());
        az_three.projects.insert(pid(405), ProjectAzAllocationStats::default());

        let az_two = stats.az_mut(&AvailabilityZone::Named("az-two".into()));
        az_two.az_resource = Some(AzResource {
            raw_capacity: 0,
            overcommit_factor: 1.0,
            observed_nonzero_capacity_before: az_two_ever_had_capacity,
        });
        if az_two_usage > 0 {
            az_two.projects.insert(pid(999), ProjectAzAllocationStats::constant_usage(az_two_usage));
        }

        stats
    }

    fn scenario_f_autogrow() -> AutogrowConfig {
        AutogrowConfig {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 5,
            allow_quota_overcommit_until_allocated_percent: 150.0,
        }
    }

    #[test]
    fn scenario_f_buildout_az_does_not_block_base_overcommit() {
        let stats = scenario_f_stats(false, 0);
        let result = distribute_quota(
            &stats,
            &scenario_f_autogrow(),
            ResourceQuotaInfo { topology: Topology::AzAware, has_quota: true },
            &BTreeMap::new(),
        );
        let any = &result.allocated[&AvailabilityZone::Any];
        assert_eq!(any[&pid(404)], 5);
        assert_eq!(any[&pid(405)], 5);
    }

    #[test]
    fn scenario_f_decommissioned_az_with_usage_forbids_base_overcommit() {
        let stats = scenario_f_stats(true, 3);
        let result = distribute_quota(
            &stats,
            &scenario_f_autogrow(),
            ResourceQuotaInfo { topology: Topology::AzAware, has_quota: true },
            &BTreeMap::new(),
        );
        let any = result.allocated.get(&AvailabilityZone::Any);
        assert_eq!(any.and_then(|m| m.get(&pid(404))).copied().unwrap_or(0), 0);
        assert_eq!(any.and_then(|m| m.get(&pid(405))).copied().unwrap_or(0), 0);
    }
}
