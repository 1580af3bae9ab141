// [libs/core/quota-distributor/src/overcommit.rs]
use quotaward_domain_models::{AllocationStats, AutogrowConfig, AvailabilityZone};
use std::collections::BTreeMap;

/// Whether an AZ is allowed to have quota allocated to it ahead of capacity
/// actually growing there. `base` governs the hard/soft minimum and base
/// quota phases; `growth` additionally governs the growth phase. An AZ can
/// permit `base` overcommit while forbidding `growth` overcommit — that's
/// the buildout/decommission case below, where we'll let existing usage
/// keep its quota but won't let autogrow push quota further into a zone
/// with no capacity behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvercommitPermission {
    pub base: bool,
    pub growth: bool,
}

impl OvercommitPermission {
    const ALLOW_ALL: Self = Self { base: true, growth: true };
    const DENY_ALL: Self = Self { base: false, growth: false };

    fn and(self, other: Self) -> Self {
        Self {
            base: self.base && other.base,
            growth: self.growth && other.growth,
        }
    }
}

/// An AZ with zero capacity is either still being built out (never had
/// capacity yet) or has been decommissioned (had capacity, now empty of
/// both capacity and usage). Both states permit base overcommit so that
/// in-flight usage keeps its quota; only the buildout case permits growth,
/// since growing quota into a decommissioned AZ makes no sense.
fn permission_for_zero_capacity(observed_nonzero_capacity_before: bool, used: u64) -> OvercommitPermission {
    let is_buildout_or_decommission = !observed_nonzero_capacity_before || used == 0;
    if is_buildout_or_decommission {
        OvercommitPermission { base: true, growth: false }
    } else {
        OvercommitPermission::DENY_ALL
    }
}

fn permission_for_nonzero_capacity(capacity: u64, used: u64, autogrow: &AutogrowConfig) -> OvercommitPermission {
    let allocated_percent = 100.0 * (used as f64) / (capacity as f64);
    let allow = allocated_percent < autogrow.allow_quota_overcommit_until_allocated_percent;
    OvercommitPermission { base: allow, growth: allow }
}

/// Computes the overcommit permission for every AZ that carries its own
/// capacity data, plus, for `AzAware`/`Flat` resources, the aggregate
/// permission for the `any` pseudo-AZ when it has no capacity data of its
/// own (the usual `AzAware` case: `any`'s permission is the conjunction of
/// every real AZ's permission).
pub fn compute_overcommit_permissions(
    stats: &AllocationStats,
    autogrow: &AutogrowConfig,
) -> BTreeMap<AvailabilityZone, OvercommitPermission> {
    let mut permissions = BTreeMap::new();
    let mut real_permissions: Vec<OvercommitPermission> = Vec::new();

    for (az, az_stats) in &stats.by_az {
        let Some(resource) = az_stats.az_resource else { continue };
        let capacity = resource.capacity();
        let used = az_stats.used_capacity();
        let permission = if capacity == 0 {
            permission_for_zero_capacity(resource.observed_nonzero_capacity_before, used)
        } else {
            permission_for_nonzero_capacity(capacity, used, autogrow)
        };
        if az.is_real() {
            real_permissions.push(permission);
        }
        permissions.insert(az.clone(), permission);
    }

    if !permissions.contains_key(&AvailabilityZone::Any) {
        let aggregate = real_permissions
            .into_iter()
            .fold(OvercommitPermission::ALLOW_ALL, OvercommitPermission::and);
        permissions.insert(AvailabilityZone::Any, aggregate);
    }

    permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotaward_domain_models::{AzAllocationStats, AzResource, ProjectAzAllocationStats, ProjectId, ResourceName, ServiceType};
    use uuid::Uuid;

    fn pid(n: u128) -> ProjectId {
        ProjectId(Uuid::from_u128(n))
    }

    #[test]
    fn zero_capacity_buildout_permits_base_not_growth() {
        assert_eq!(
            permission_for_zero_capacity(false, 0),
            OvercommitPermission { base: true, growth: false }
        );
    }

    #[test]
    fn zero_capacity_decommissioned_with_no_usage_permits_base() {
        assert_eq!(
            permission_for_zero_capacity(true, 0),
            OvercommitPermission { base: true, growth: false }
        );
    }

    #[test]
    fn zero_capacity_decommissioned_with_usage_denies_all() {
        assert_eq!(permission_for_zero_capacity(true, 5), OvercommitPermission::DENY_ALL);
    }

    #[test]
    fn nonzero_capacity_below_threshold_allows_both() {
        let autogrow = AutogrowConfig {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 0,
            allow_quota_overcommit_until_allocated_percent: 80.0,
        };
        let permission = permission_for_nonzero_capacity(100, 50, &autogrow);
        assert_eq!(permission, OvercommitPermission { base: true, growth: true });
    }

    #[test]
    fn nonzero_capacity_at_or_above_threshold_denies_both() {
        let autogrow = AutogrowConfig {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 0,
            allow_quota_overcommit_until_allocated_percent: 80.0,
        };
        let permission = permission_for_nonzero_capacity(100, 90, &autogrow);
        assert_eq!(permission, OvercommitPermission::DENY_ALL);
    }

    #[test]
    fn any_pseudo_az_aggregates_real_azs_when_it_has_no_capacity_of_its_own() {
        let autogrow = AutogrowConfig {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 0,
            allow_quota_overcommit_until_allocated_percent: 150.0,
        };
        let mut stats = AllocationStats::new(ServiceType("compute".into()), ResourceName("cores".into()));

        let az_one = stats.az_mut(&AvailabilityZone::Named("az-one".into()));
        az_one.az_resource = Some(AzResource::new(10, 1.0));
        az_one.projects.insert(pid(1), ProjectAzAllocationStats::constant_usage(5));

        let az_two = stats.az_mut(&AvailabilityZone::Named("az-two".into()));
        az_two.az_resource = Some(AzResource { raw_capacity: 0, overcommit_factor: 1.0, observed_nonzero_capacity_before: false });

        let permissions = compute_overcommit_permissions(&stats, &autogrow);
        assert_eq!(permissions[&AvailabilityZone::Named("az-one".into())], OvercommitPermission { base: true, growth: true });
        assert_eq!(permissions[&AvailabilityZone::Named("az-two".into())], OvercommitPermission { base: true, growth: false });
        // az-two's growth:false drags the aggregate's growth down, but both real AZs' base:true keeps it.
        assert_eq!(permissions[&AvailabilityZone::Any], OvercommitPermission { base: true, growth: false });
    }

    #[test]
    fn any_with_its_own_capacity_entry_is_not_aggregated() {
        let autogrow = AutogrowConfig {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 0,
            allow_quota_overcommit_until_allocated_percent: 0.0,
        };
        let mut stats = AllocationStats::new(ServiceType("compute".into()), ResourceName("cores".into()));
        let any = stats.az_mut(&AvailabilityZone::Any);
        any.az_resource = Some(AzResource::new(100, 1.0));
        any.projects.insert(pid(1), ProjectAzAllocationStats::constant_usage(10));

        let permissions = compute_overcommit_permissions(&stats, &autogrow);
        assert_eq!(permissions[&AvailabilityZone::Any], OvercommitPermission::DENY_ALL);
    }
}
