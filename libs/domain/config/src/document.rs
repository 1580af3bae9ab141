// [libs/domain/config/src/document.rs]
use serde::{Deserialize, Serialize};

/// Top-level shape of the structured configuration document (§6). Parsed
/// from YAML at startup; never mutated afterwards — a reload parses a new
/// document and the caller swaps in a freshly built `Cluster` snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub liquids: std::collections::BTreeMap<String, LiquidConfig>,
    #[serde(default)]
    pub resource_behavior: Vec<ResourceBehaviorEntry>,
    #[serde(default)]
    pub quota_distribution_configs: Vec<QuotaDistributionEntry>,
    #[serde(default)]
    pub mail_notifications: Option<MailNotificationsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub method: String,
}

/// One `liquids.{name}` entry: which service a liquid backend scrapes and
/// pushes quota for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidConfig {
    pub area: String,
    pub liquid_service_type: String,
}

/// One `resource_behavior[]` entry. `resource` is a regex matched against
/// `"{service_type}/{resource_name}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBehaviorEntry {
    pub resource: String,
    #[serde(default)]
    pub identity_in_v1_api: Option<String>,
    #[serde(default)]
    pub commitment_durations: Vec<String>,
    #[serde(default)]
    pub commitment_until_percent: Option<f64>,
    #[serde(default)]
    pub overcommit_factor: Option<f64>,
}

/// One `quota_distribution_configs[]` entry. `resource` is a regex matched
/// the same way as `ResourceBehaviorEntry::resource`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaDistributionEntry {
    pub resource: String,
    #[serde(default)]
    pub autogrow: Option<AutogrowEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutogrowEntry {
    #[serde(default = "default_growth_multiplier")]
    pub growth_multiplier: f64,
    #[serde(default)]
    pub growth_minimum: u64,
    #[serde(default)]
    pub project_base_quota: u64,
    #[serde(default)]
    pub allow_quota_overcommit_until_allocated_percent: f64,
}

fn default_growth_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailNotificationsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub templates_path: Option<String>,
}

impl ConfigDocument {
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_document() {
        let yaml = r#"
availability_zones: [az-one, az-two]
discovery:
  method: static
liquids:
  cinder:
    area: storage
    liquid_service_type: volumev2
resource_behavior:
  - resource: "compute/cores"
    commitment_until_percent: 90.0
quota_distribution_configs:
  - resource: "compute/.*"
    autogrow:
      growth_multiplier: 1.2
      project_base_quota: 10
"#;
        let doc = ConfigDocument::from_yaml_str(yaml).expect("parses");
        assert_eq!(doc.availability_zones, vec!["az-one", "az-two"]);
        assert_eq!(doc.discovery.method, "static");
        assert_eq!(doc.liquids["cinder"].liquid_service_type, "volumev2");
        assert_eq!(doc.resource_behavior[0].commitment_until_percent, Some(90.0));
        assert_eq!(
            doc.quota_distribution_configs[0].autogrow.unwrap().growth_multiplier,
            1.2
        );
    }
}
