// [libs/domain/config/src/overrides.rs]
use quotaward_domain_models::{ProjectId, ResourceName, ServiceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the `LIMES_QUOTA_OVERRIDES_PATH` JSON side-file: an
/// operator-supplied override quota for one (domain, project, service,
/// resource), independent of the structured configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaOverrideEntry {
    pub domain_name: String,
    pub project_id: ProjectId,
    pub service_type: ServiceType,
    pub resource_name: ResourceName,
    pub override_quota: u64,
}

/// Parsed contents of the overrides side-file, indexed for lookup by the
/// quota distributor's `OverrideQuotaFromConfig` field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaOverrides {
    by_project_resource: BTreeMap<(ProjectId, ServiceType, ResourceName), u64>,
}

impl QuotaOverrides {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<QuotaOverrideEntry> = serde_json::from_str(text)?;
        let by_project_resource = entries
            .into_iter()
            .map(|entry| {
                (
                    (entry.project_id, entry.service_type, entry.resource_name),
                    entry.override_quota,
                )
            })
            .collect();
        Ok(Self { by_project_resource })
    }

    pub fn get(&self, project: ProjectId, service_type: &ServiceType, resource_name: &ResourceName) -> Option<u64> {
        self.by_project_resource
            .get(&(project, service_type.clone(), resource_name.clone()))
            .copied()
    }
}
