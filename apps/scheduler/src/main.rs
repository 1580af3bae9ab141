// [apps/scheduler/src/main.rs]
//! Entry point for one scheduling cycle: a confirmation pass over a single
//! `(ServiceType, ResourceName, AZ)` location, followed by a quota
//! distribution pass for the resource that location belongs to. This is a
//! single-invocation tool, not a looping daemon (spec.md §1 non-goals) —
//! run it from cron or an external scheduler.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use quotaward_core_commitments::{SystemClock, SystemIdSource};
use quotaward_core_quota_distributor::{distribute_quota, ResourceQuotaInfo};
use quotaward_core_scheduler::{CommitmentStoragePort, ConfirmationScheduler, Location, NullBackend};
use quotaward_domain_config::{Cluster, ConfigDocument};
use quotaward_domain_models::{AllocationStats, AvailabilityZone, ResourceName, ServiceType, Topology};
use quotaward_domain_notification::{MailSink, RecordingMailSink};
use quotaward_infra_storage::{LibsqlCommitmentRepository, StorageClient};

#[derive(Parser, Debug)]
#[command(
    name = "scheduler",
    version,
    about = "Runs one commitment confirmation pass and one quota distribution pass for a location."
)]
struct CommandArguments {
    /// Path to the structured configuration document (YAML, §6).
    #[arg(long, value_name = "FILE_PATH", env = "QUOTAWARD_CONFIG_PATH")]
    config: PathBuf,

    /// libsql database URL (`file:` path for embedded, `libsql://` for remote).
    #[arg(long, env = "QUOTAWARD_DATABASE_URL")]
    database_url: String,

    /// Auth token for a remote libsql database. Unused for embedded files.
    #[arg(long, env = "QUOTAWARD_AUTH_TOKEN")]
    auth_token: Option<String>,

    /// Cloud service the location belongs to, e.g. "compute".
    #[arg(long)]
    service_type: String,

    /// Resource within the service, e.g. "cores".
    #[arg(long)]
    resource_name: String,

    /// Availability zone to run the confirmation pass against.
    #[arg(long)]
    az: String,

    /// Resource topology, used to pick the quota distribution strategy.
    #[arg(long, value_enum, default_value = "az-aware")]
    topology: TopologyArg,

    /// Whether the resource carries quota at all (skips distribution otherwise).
    #[arg(long, default_value_t = true)]
    has_quota: bool,

    /// Compute and log everything, but do not persist confirmations or offer
    /// updates back to storage.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Run a single pass and exit. The default. Passing `--once=false` turns
    /// this into an illustrative sleep loop for local exercising only — it
    /// has no backoff, retry or distributed locking, so it is not a
    /// substitute for a real scheduler (cron, systemd timer, k8s CronJob).
    #[arg(long, default_value_t = true)]
    once: bool,

    /// Seconds to sleep between passes when `--once=false`.
    #[arg(long, default_value_t = 300)]
    interval_seconds: u64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum TopologyArg {
    Flat,
    AzAware,
    AzSeparated,
}

impl From<TopologyArg> for Topology {
    fn from(value: TopologyArg) -> Self {
        match value {
            TopologyArg::Flat => Topology::Flat,
            TopologyArg::AzAware => Topology::AzAware,
            TopologyArg::AzSeparated => Topology::AzSeparated,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    quotaward_shared_telemetry::init_tracing("scheduler");

    let args = CommandArguments::parse();

    let config_text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading configuration document at {}", args.config.display()))?;
    let document = ConfigDocument::from_yaml_str(&config_text).context("parsing configuration document")?;
    let cluster = Cluster::build(document).context("building cluster snapshot")?;

    let storage = StorageClient::connect(&args.database_url, args.auth_token.clone())
        .await
        .context("connecting to storage backend")?;
    let repository = LibsqlCommitmentRepository::new(storage);

    let location = Location {
        service_type: ServiceType(args.service_type.clone()),
        resource_name: ResourceName(args.resource_name.clone()),
        az: AvailabilityZone::Named(args.az.clone()),
    };

    if args.once {
        run_confirmation_pass(&repository, &cluster, &location, args.dry_run).await?;
        run_quota_distribution_pass(&repository, &cluster, &args, &location).await?;
        return Ok(());
    }

    warn!(
        interval_seconds = args.interval_seconds,
        "running in sleep-loop mode — illustrative only, no backoff or distributed lock"
    );
    loop {
        if let Err(error) = run_confirmation_pass(&repository, &cluster, &location, args.dry_run).await {
            warn!(%error, "confirmation pass failed, continuing to next interval");
        }
        if let Err(error) = run_quota_distribution_pass(&repository, &cluster, &args, &location).await {
            warn!(%error, "quota distribution pass failed, continuing to next interval");
        }
        tokio::time::sleep(std::time::Duration::from_secs(args.interval_seconds)).await;
    }
}

async fn run_confirmation_pass(
    repository: &LibsqlCommitmentRepository,
    cluster: &Cluster,
    location: &Location,
    dry_run: bool,
) -> Result<()> {
    let behavior = cluster.commitment_behavior(&location.service_type.0, &location.resource_name.0);

    if dry_run {
        warn!(%location, "dry run: confirmation pass will not persist results");
        return Ok(());
    }

    let clock = SystemClock;
    let ids = SystemIdSource;
    // No resource in this deployment advertises `HandlesCommitments` yet; a
    // real `LiquidBackend` wiring point lands here once one does.
    let backend = NullBackend;
    let scheduler = ConfirmationScheduler::new(&clock, &ids, repository, &backend);

    let report = scheduler
        .run_pass(location, &behavior)
        .await
        .with_context(|| format!("running confirmation pass for {location}"))?;

    info!(
        %location,
        confirmed = report.confirmed_count,
        consumed_offers = report.consumed_offer_count,
        "confirmation pass complete"
    );

    let mail_sink = RecordingMailSink::default();
    for notification in &report.mail {
        if let Err(error) = mail_sink.send(notification).await {
            warn!(%error, "failed to hand notification to mail sink");
        }
    }
    for event in &report.audit {
        info!(?event, "audit event");
    }

    Ok(())
}

/// Quota distribution needs every AZ for the resource, not just the one the
/// confirmation pass just ran against, so this assembles an `AllocationStats`
/// by querying the storage port once per configured AZ plus the `any`
/// pseudo-AZ. Persisting the distributed `Allocated` grid back to
/// `project_resources`/`project_az_resources` is left to the external sync
/// job spec.md §1 excludes from this repository's scope — this pass only
/// computes and logs the result.
async fn run_quota_distribution_pass(
    repository: &LibsqlCommitmentRepository,
    cluster: &Cluster,
    args: &CommandArguments,
    primary_location: &Location,
) -> Result<()> {
    if !args.has_quota {
        info!(location = %primary_location, "resource carries no quota, skipping distribution pass");
        return Ok(());
    }

    let autogrow = cluster.autogrow_config(&args.service_type, &args.resource_name);

    let mut azs: Vec<AvailabilityZone> = cluster
        .availability_zones()
        .iter()
        .map(|name| AvailabilityZone::Named(name.clone()))
        .collect();
    if !azs.contains(&primary_location.az) {
        azs.push(primary_location.az.clone());
    }
    azs.push(AvailabilityZone::Any);

    let mut stats = AllocationStats::new(
        ServiceType(args.service_type.clone()),
        ResourceName(args.resource_name.clone()),
    );
    for az in &azs {
        let location = Location {
            service_type: ServiceType(args.service_type.clone()),
            resource_name: ResourceName(args.resource_name.clone()),
            az: az.clone(),
        };
        match repository.load_allocation_stats(&location).await {
            Ok(az_stats) => {
                *stats.az_mut(az) = az_stats;
            }
            Err(error) => {
                warn!(%location, %error, "skipping AZ with unloadable allocation stats");
            }
        }
    }

    let resource = ResourceQuotaInfo {
        topology: args.topology.into(),
        has_quota: args.has_quota,
    };
    let result = distribute_quota(&stats, &autogrow, resource, &BTreeMap::new());

    for (az, allocations) in &result.allocated {
        for (project_id, amount) in allocations {
            info!(%az, %project_id, allocated = amount, "quota distribution result");
        }
    }

    Ok(())
}
