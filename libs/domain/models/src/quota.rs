// [libs/domain/models/src/quota.rs]
use serde::{Deserialize, Serialize};

/// Per-(AZ resource, project) usage/commitment/history snapshot.
///
/// Invariant upheld by the loader, not by this type: after each scrape,
/// `min_historical_usage <= usage <= max_historical_usage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectAzAllocationStats {
    pub usage: u64,
    pub committed: u64,
    pub min_historical_usage: u64,
    pub max_historical_usage: u64,
}

impl ProjectAzAllocationStats {
    pub fn constant_usage(amount: u64) -> Self {
        Self {
            usage: amount,
            committed: 0,
            min_historical_usage: amount,
            max_historical_usage: amount,
        }
    }
}

/// Derived per-(resource, project) quota record. `quota` is `None` when the resource
/// `!has_quota` or is `AzSeparated` (per-AZ quota only, no aggregate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectResourceQuota {
    pub quota: Option<u64>,
    pub backend_quota: Option<u64>,
    pub forbidden: bool,
    pub max_quota_from_outside_admin: Option<u64>,
    pub max_quota_from_local_admin: Option<u64>,
    pub override_quota_from_config: Option<u64>,
}

impl ProjectResourceQuota {
    /// True when the backend hasn't yet been told about the current
    /// `quota` — the external sync job's trigger to push a new value.
    pub fn is_desynced(&self) -> bool {
        self.quota != self.backend_quota
    }
}

/// Per-project local overrides consumed by constraint enforcement during
/// quota distribution. `max_quota = Some(0)` forbids the project from
/// holding any quota for this resource; callers that need to special-case it
/// should check for it
/// explicitly rather than relying on `Option::is_some()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalQuotaConstraints {
    pub min_quota: Option<u64>,
    pub max_quota: Option<u64>,
}

impl LocalQuotaConstraints {
    pub fn is_forbidden(&self) -> bool {
        self.max_quota == Some(0)
    }
}

/// `Autogrow` configuration for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutogrowConfig {
    pub growth_multiplier: f64,
    pub growth_minimum: u64,
    pub project_base_quota: u64,
    pub allow_quota_overcommit_until_allocated_percent: f64,
}

impl Default for AutogrowConfig {
    fn default() -> Self {
        Self {
            growth_multiplier: 1.0,
            growth_minimum: 0,
            project_base_quota: 0,
            allow_quota_overcommit_until_allocated_percent: 0.0,
        }
    }
}

/// `CommitmentBehavior` configuration for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitmentBehavior {
    /// `UntilPercent`, in `(0, 100]` when set. `None` means the
    /// commitability threshold defaults to the full capacity.
    pub until_percent: Option<f64>,
}
