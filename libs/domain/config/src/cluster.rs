// [libs/domain/config/src/cluster.rs]
use crate::document::{ConfigDocument, QuotaDistributionEntry, ResourceBehaviorEntry};
use quotaward_domain_models::{AutogrowConfig, CommitmentBehavior};
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid resource pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A resource-matching rule compiled once at build time: the raw regex plus
/// the behavior it resolves to.
struct CompiledRule<T> {
    pattern: Regex,
    value: T,
}

/// Process-wide, read-only description of services/resources/topologies
/// and the per-resource behaviors derived from the configuration document.
/// Built once at startup (or on a controlled reload) and shared by every
/// pass as an `Arc<Cluster>`; never mutated in place — a reload produces a
/// new `Cluster` and the caller atomically swaps the `Arc`.
pub struct Cluster {
    document: ConfigDocument,
    resource_behaviors: Vec<CompiledRule<ResourceBehaviorEntry>>,
    quota_distribution_configs: Vec<CompiledRule<QuotaDistributionEntry>>,
}

impl Cluster {
    pub fn build(document: ConfigDocument) -> Result<Arc<Self>, ClusterError> {
        let resource_behaviors = document
            .resource_behavior
            .iter()
            .cloned()
            .map(|entry| {
                let pattern = Regex::new(&entry.resource).map_err(|source| ClusterError::InvalidPattern {
                    pattern: entry.resource.clone(),
                    source,
                })?;
                Ok(CompiledRule { pattern, value: entry })
            })
            .collect::<Result<Vec<_>, ClusterError>>()?;

        let quota_distribution_configs = document
            .quota_distribution_configs
            .iter()
            .cloned()
            .map(|entry| {
                let pattern = Regex::new(&entry.resource).map_err(|source| ClusterError::InvalidPattern {
                    pattern: entry.resource.clone(),
                    source,
                })?;
                Ok(CompiledRule { pattern, value: entry })
            })
            .collect::<Result<Vec<_>, ClusterError>>()?;

        Ok(Arc::new(Self {
            document,
            resource_behaviors,
            quota_distribution_configs,
        }))
    }

    pub fn availability_zones(&self) -> &[String] {
        &self.document.availability_zones
    }

    /// First matching `resource_behavior[]` entry for `"{service_type}/{resource_name}"`,
    /// resolved to a `CommitmentBehavior` plus the configured overcommit
    /// factor (`None` defaults to `1.0` at the AZ-resource layer).
    pub fn commitment_behavior(&self, service_type: &str, resource_name: &str) -> CommitmentBehavior {
        let key = format!("{service_type}/{resource_name}");
        self.resource_behaviors
            .iter()
            .find(|rule| rule.pattern.is_match(&key))
            .map(|rule| CommitmentBehavior {
                until_percent: rule.value.commitment_until_percent,
            })
            .unwrap_or_default()
    }

    pub fn overcommit_factor(&self, service_type: &str, resource_name: &str) -> f64 {
        let key = format!("{service_type}/{resource_name}");
        self.resource_behaviors
            .iter()
            .find(|rule| rule.pattern.is_match(&key))
            .and_then(|rule| rule.value.overcommit_factor)
            .unwrap_or(1.0)
    }

    /// First matching `quota_distribution_configs[]` entry's `autogrow`
    /// block, or the conservative default (`GrowthMultiplier=1.0`, no base
    /// quota, no overcommit) when nothing matches.
    pub fn autogrow_config(&self, service_type: &str, resource_name: &str) -> AutogrowConfig {
        let key = format!("{service_type}/{resource_name}");
        self.quota_distribution_configs
            .iter()
            .find(|rule| rule.pattern.is_match(&key))
            .and_then(|rule| rule.value.autogrow)
            .map(|entry| AutogrowConfig {
                growth_multiplier: entry.growth_multiplier,
                growth_minimum: entry.growth_minimum,
                project_base_quota: entry.project_base_quota,
                allow_quota_overcommit_until_allocated_percent: entry
                    .allow_quota_overcommit_until_allocated_percent,
            })
            .unwrap_or_default()
    }

    pub fn mail_notifications_enabled(&self) -> bool {
        self.document
            .mail_notifications
            .as_ref()
            .map(|m| m.enabled)
            .unwrap_or(false)
    }
}
