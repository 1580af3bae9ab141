// [libs/infra/storage/src/repository.rs]
use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use tracing::{instrument, warn};
use uuid::Uuid;

use quotaward_core_scheduler::{CommitmentStoragePort, Error as SchedulerError, Location};
use quotaward_domain_models::{
    AzAllocationStats, AzResource, Commitment, CommitmentStatus, ProjectAzAllocationStats,
    ProjectId, TransferStatus,
};

use crate::client::StorageClient;
use crate::errors::DbError;
use crate::queries;

/// `CommitmentStoragePort` implementation over `libsql`. One instance is
/// shared across every `(ServiceType, ResourceName, AZ)` location the
/// scheduler visits; each method resolves its own `az_resource_id` rather
/// than caching one, since a single process runs passes for many locations.
pub struct LibsqlCommitmentRepository {
    client: StorageClient,
}

impl LibsqlCommitmentRepository {
    pub fn new(client: StorageClient) -> Self {
        Self { client }
    }

    async fn resolve_az_resource_id(&self, location: &Location) -> Result<i64, DbError> {
        let connection = self.client.connection()?;
        let mut rows = connection
            .query(
                queries::FIND_LOCATION_IDS,
                params![
                    location.service_type.0.clone(),
                    location.resource_name.0.clone(),
                    location.az.to_string(),
                ],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Err(DbError::NotFound),
        }
    }

    fn row_to_commitment(row: &Row, location: &Location) -> Result<Commitment, DbError> {
        let id: String = row.get(0)?;
        let project_uuid: String = row.get(1)?;
        let amount: i64 = row.get(2)?;
        let duration_seconds: i64 = row.get(3)?;
        let status: String = row.get(4)?;
        let transfer_status: String = row.get(5)?;
        let transfer_token: Option<String> = row.get(6)?;
        let creator_uuid: String = row.get(7)?;
        let creator_name: String = row.get(8)?;
        let created_at: String = row.get(9)?;
        let confirm_by: Option<String> = row.get(10)?;
        let confirmed_at: Option<String> = row.get(11)?;
        let expires_at: String = row.get(12)?;
        let superseded_at: Option<String> = row.get(13)?;
        let transfer_started_at: Option<String> = row.get(14)?;
        let creation_context_json: String = row.get(15)?;
        let supersede_context_json: Option<String> = row.get(16)?;

        Ok(Commitment {
            id: parse_uuid(&id)?,
            project_id: ProjectId(parse_uuid(&project_uuid)?),
            service_type: location.service_type.clone(),
            resource_name: location.resource_name.clone(),
            az: location.az.clone(),
            amount: amount.try_into().map_err(|_| DbError::MappingError(format!("negative amount {amount}")))?,
            duration_seconds,
            status: parse_status(&status)?,
            transfer_status: parse_transfer_status(&transfer_status)?,
            transfer_token,
            creator_uuid: parse_uuid(&creator_uuid)?,
            creator_name,
            created_at: parse_timestamp(&created_at)?,
            confirm_by: confirm_by.as_deref().map(parse_timestamp).transpose()?,
            confirmed_at: confirmed_at.as_deref().map(parse_timestamp).transpose()?,
            expires_at: parse_timestamp(&expires_at)?,
            superseded_at: superseded_at.as_deref().map(parse_timestamp).transpose()?,
            transfer_started_at: transfer_started_at.as_deref().map(parse_timestamp).transpose()?,
            creation_context: serde_json::from_str(&creation_context_json)
                .map_err(|e| DbError::MappingError(format!("creation_context: {e}")))?,
            supersede_context: supersede_context_json
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .map_err(|e| DbError::MappingError(format!("supersede_context: {e}")))?,
        })
    }

    #[instrument(skip(self))]
    async fn load_pending_rows(&self, az_resource_id: i64, location: &Location) -> Result<Vec<Commitment>, DbError> {
        let connection = self.client.connection()?;
        let mut rows = connection
            .query(queries::LOAD_PENDING_COMMITMENTS, params![az_resource_id])
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::row_to_commitment(&row, location)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    async fn persist(&self, commitment: &Commitment, az_resource_id: i64) -> Result<(), DbError> {
        let connection = self.client.connection()?;
        let creation_context_json = serde_json::to_string(&commitment.creation_context)
            .map_err(|e| DbError::MappingError(format!("creation_context: {e}")))?;
        let supersede_context_json = commitment
            .supersede_context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::MappingError(format!("supersede_context: {e}")))?;

        connection
            .execute(
                queries::UPSERT_COMMITMENT,
                params![
                    commitment.id.to_string(),
                    commitment.project_id.0.to_string(),
                    az_resource_id,
                    status_str(commitment.status),
                    i64::try_from(commitment.amount)
                        .map_err(|_| DbError::MappingError("amount overflows i64".into()))?,
                    commitment.duration_seconds,
                    commitment.created_at.to_rfc3339(),
                    commitment.creator_uuid.to_string(),
                    commitment.creator_name.clone(),
                    commitment.confirm_by.map(|t| t.to_rfc3339()),
                    commitment.confirmed_at.map(|t| t.to_rfc3339()),
                    commitment.expires_at.to_rfc3339(),
                    commitment.superseded_at.map(|t| t.to_rfc3339()),
                    transfer_status_str(commitment.transfer_status),
                    commitment.transfer_token.clone(),
                    commitment.transfer_started_at.map(|t| t.to_rfc3339()),
                    creation_context_json,
                    supersede_context_json,
                ],
            )
            .await?;
        Ok(())
    }

    /// Parses the `historical_usage` column (a JSON array of the envelope's
    /// observed usage samples). Per §4.1, an unparseable series is not
    /// fatal to the whole load: the project falls back to its current
    /// `usage` as a one-point envelope and the pass continues.
    fn parse_historical_envelope(project_uuid: &str, usage: u64, raw: Option<&str>) -> (u64, u64) {
        let Some(raw) = raw else {
            return (usage, usage);
        };
        match serde_json::from_str::<Vec<u64>>(raw) {
            Ok(series) if !series.is_empty() => {
                let min = series.iter().copied().min().unwrap_or(usage).min(usage);
                let max = series.iter().copied().max().unwrap_or(usage).max(usage);
                (min, max)
            }
            Ok(_) => (usage, usage),
            Err(error) => {
                warn!(project_uuid, %error, "unparseable historical_usage series, falling back to current usage");
                (usage, usage)
            }
        }
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::from_str(raw).map_err(|e| DbError::MappingError(format!("uuid {raw:?}: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::MappingError(format!("timestamp {raw:?}: {e}")))
}

fn parse_status(raw: &str) -> Result<CommitmentStatus, DbError> {
    Ok(match raw {
        "planned" => CommitmentStatus::Planned,
        "pending" => CommitmentStatus::Pending,
        "confirmed" => CommitmentStatus::Confirmed,
        "superseded" => CommitmentStatus::Superseded,
        "expired" => CommitmentStatus::Expired,
        other => return Err(DbError::MappingError(format!("unknown commitment status {other:?}"))),
    })
}

fn status_str(status: CommitmentStatus) -> &'static str {
    match status {
        CommitmentStatus::Planned => "planned",
        CommitmentStatus::Pending => "pending",
        CommitmentStatus::Confirmed => "confirmed",
        CommitmentStatus::Superseded => "superseded",
        CommitmentStatus::Expired => "expired",
    }
}

fn parse_transfer_status(raw: &str) -> Result<TransferStatus, DbError> {
    Ok(match raw {
        "none" => TransferStatus::None,
        "public" => TransferStatus::Public,
        other => return Err(DbError::MappingError(format!("unknown transfer status {other:?}"))),
    })
}

fn transfer_status_str(status: TransferStatus) -> &'static str {
    match status {
        TransferStatus::None => "none",
        TransferStatus::Public => "public",
    }
}

#[async_trait]
impl CommitmentStoragePort for LibsqlCommitmentRepository {
    #[instrument(skip(self))]
    async fn load_pending(&self, location: &Location) -> Result<Vec<Commitment>, SchedulerError> {
        let az_resource_id = self
            .resolve_az_resource_id(location)
            .await
            .map_err(to_scheduler_error)?;
        self.load_pending_rows(az_resource_id, location)
            .await
            .map_err(to_scheduler_error)
    }

    #[instrument(skip(self))]
    async fn load_allocation_stats(&self, location: &Location) -> Result<AzAllocationStats, SchedulerError> {
        let az_resource_id = self
            .resolve_az_resource_id(location)
            .await
            .map_err(to_scheduler_error)?;
        let connection = self.client.connection().map_err(to_scheduler_error)?;

        let mut capacity_rows = connection
            .query(queries::LOAD_AZ_CAPACITY, params![az_resource_id])
            .await
            .map_err(DbError::from)
            .map_err(to_scheduler_error)?;
        let az_resource = match capacity_rows.next().await.map_err(DbError::from).map_err(to_scheduler_error)? {
            Some(row) => {
                let raw_capacity: i64 = row.get(0).map_err(DbError::from).map_err(to_scheduler_error)?;
                let observed_nonzero: Option<i64> = row.get(1).map_err(DbError::from).map_err(to_scheduler_error)?;
                Some(AzResource {
                    raw_capacity: raw_capacity.max(0) as u64,
                    overcommit_factor: 1.0,
                    observed_nonzero_capacity_before: observed_nonzero.unwrap_or(0) > 0,
                })
            }
            None => None,
        };

        let mut project_rows = connection
            .query(queries::LOAD_PROJECT_AZ_STATS, params![az_resource_id])
            .await
            .map_err(DbError::from)
            .map_err(to_scheduler_error)?;

        let mut projects = BTreeMap::new();
        while let Some(row) = project_rows
            .next()
            .await
            .map_err(DbError::from)
            .map_err(to_scheduler_error)?
        {
            let project_uuid: String = row.get(0).map_err(DbError::from).map_err(to_scheduler_error)?;
            let usage: i64 = row.get(1).map_err(DbError::from).map_err(to_scheduler_error)?;
            let historical_usage: Option<String> = row.get(2).map_err(DbError::from).map_err(to_scheduler_error)?;
            let committed: i64 = row.get(3).map_err(DbError::from).map_err(to_scheduler_error)?;

            let usage = usage.max(0) as u64;
            let (min_historical_usage, max_historical_usage) =
                Self::parse_historical_envelope(&project_uuid, usage, historical_usage.as_deref());

            let project_id = ProjectId(parse_uuid(&project_uuid).map_err(to_scheduler_error)?);
            projects.insert(
                project_id,
                ProjectAzAllocationStats {
                    usage,
                    committed: committed.max(0) as u64,
                    min_historical_usage,
                    max_historical_usage,
                },
            );
        }

        Ok(AzAllocationStats { az_resource, projects })
    }

    #[instrument(skip(self))]
    async fn load_transfer_offers(&self, location: &Location) -> Result<Vec<Commitment>, SchedulerError> {
        let az_resource_id = self
            .resolve_az_resource_id(location)
            .await
            .map_err(to_scheduler_error)?;
        let connection = self.client.connection().map_err(to_scheduler_error)?;
        let mut rows = connection
            .query(queries::LOAD_TRANSFER_OFFERS, params![az_resource_id])
            .await
            .map_err(DbError::from)
            .map_err(to_scheduler_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(DbError::from).map_err(to_scheduler_error)? {
            out.push(Self::row_to_commitment(&row, location).map_err(to_scheduler_error)?);
        }
        Ok(out)
    }

    #[instrument(skip(self, commitment))]
    async fn persist_confirmed(&self, commitment: &Commitment) -> Result<(), SchedulerError> {
        let location = commitment_location(commitment);
        let az_resource_id = self
            .resolve_az_resource_id(&location)
            .await
            .map_err(to_scheduler_error)?;
        self.persist(commitment, az_resource_id).await.map_err(to_scheduler_error)
    }

    #[instrument(skip(self, commitment))]
    async fn persist_superseded(&self, commitment: &Commitment) -> Result<(), SchedulerError> {
        let location = commitment_location(commitment);
        let az_resource_id = self
            .resolve_az_resource_id(&location)
            .await
            .map_err(to_scheduler_error)?;
        self.persist(commitment, az_resource_id).await.map_err(to_scheduler_error)
    }

    #[instrument(skip(self, commitment))]
    async fn persist_offer_update(&self, commitment: &Commitment) -> Result<(), SchedulerError> {
        let location = commitment_location(commitment);
        let az_resource_id = self
            .resolve_az_resource_id(&location)
            .await
            .map_err(to_scheduler_error)?;
        self.persist(commitment, az_resource_id).await.map_err(to_scheduler_error)
    }
}

fn commitment_location(commitment: &Commitment) -> Location {
    Location {
        service_type: commitment.service_type.clone(),
        resource_name: commitment.resource_name.clone(),
        az: commitment.az.clone(),
    }
}

fn to_scheduler_error(error: DbError) -> SchedulerError {
    match error {
        DbError::ConnectionError(msg) => SchedulerError::TransientBackend(msg),
        DbError::QueryError(err) => SchedulerError::TransientBackend(err.to_string()),
        DbError::MappingError(msg) => SchedulerError::BackendRejected(msg),
        DbError::NotFound => SchedulerError::BackendRejected("location not found".into()),
        DbError::Conflict(msg) => SchedulerError::BackendRejected(msg),
    }
}

/// Deletes a decommissioned `cluster_az_resources` row, guarded against the
/// cascade hazard spec.md §6 calls out: an AZ resource with active
/// (non-terminal) commitments must not be dropped out from under them.
/// Not part of `CommitmentStoragePort` — this is cluster-config maintenance,
/// invoked by the config sync path rather than a scheduler pass.
pub async fn delete_az_resource_if_unreferenced(client: &StorageClient, az_resource_id: i64) -> Result<(), DbError> {
    let connection = client.connection()?;
    let mut rows = connection
        .query(queries::COUNT_ACTIVE_COMMITMENTS_FOR_AZ, params![az_resource_id])
        .await?;
    let active: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };
    if active > 0 {
        return Err(DbError::Conflict(format!(
            "az_resource {az_resource_id} still has {active} active commitment(s)"
        )));
    }
    connection
        .execute(queries::DELETE_TERMINAL_COMMITMENTS_FOR_AZ, params![az_resource_id])
        .await?;
    connection.execute(queries::DELETE_AZ_RESOURCE, params![az_resource_id]).await?;
    Ok(())
}
