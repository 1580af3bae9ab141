// [libs/domain/config/src/lib.rs]
//! Structured configuration document (§6) and the immutable `Cluster`
//! snapshot derived from it, plus the `LIMES_QUOTA_OVERRIDES_PATH` side
//! file. Parsing is pure; nothing here touches the filesystem — callers
//! read the YAML/JSON text themselves (typically in `apps/scheduler`) and
//! hand it to `ConfigDocument::from_yaml_str` / `QuotaOverrides::from_json_str`.

mod cluster;
mod document;
mod overrides;

pub use cluster::{Cluster, ClusterError};
pub use document::{
    AutogrowEntry, ConfigDocument, DiscoveryConfig, LiquidConfig, MailNotificationsConfig,
    QuotaDistributionEntry, ResourceBehaviorEntry,
};
pub use overrides::{QuotaOverrideEntry, QuotaOverrides};
