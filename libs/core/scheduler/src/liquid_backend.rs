// [libs/core/scheduler/src/liquid_backend.rs]
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quotaward_domain_models::{CommitmentStatus, ProjectId};

use crate::errors::Error;

/// One project's proposed commitment transition, as sent to a backend that
/// advertises `HandlesCommitments` (§6, §9 "polymorphism over capability
/// sets").
#[derive(Debug, Clone, PartialEq)]
pub struct CommitmentTransition {
    pub commitment_id: Uuid,
    pub project_id: ProjectId,
    pub amount: u64,
    pub old_status: CommitmentStatus,
    pub new_status: CommitmentStatus,
    pub confirm_by: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitmentChangeRequest {
    pub transitions: Vec<CommitmentTransition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitmentChangeResponse {
    /// A non-empty reason is treated as a negative admission decision
    /// (§6) — the caller must not apply any of the proposed transitions.
    pub rejection_reason: Option<String>,
    pub retry_at: Option<DateTime<Utc>>,
}

impl CommitmentChangeResponse {
    pub fn accepted(&self) -> bool {
        self.rejection_reason.is_none()
    }
}

/// The per-service driver boundary (§9): `Init`/`BuildServiceInfo`/
/// `ScanCapacity`/`ScanUsage`/`SetQuota` are the scraper/worker-loop
/// surface spec.md §1 puts out of scope; `change_commitments` is the one
/// operation `ConfirmationScheduler` itself calls, and only for resources
/// that advertise `handles_commitments()`.
#[async_trait]
pub trait LiquidBackend: Send + Sync {
    fn handles_commitments(&self) -> bool;

    async fn change_commitments(
        &self,
        request: CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, Error>;
}

/// A resource whose commitments the core engine confirms directly,
/// without consulting an external backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl LiquidBackend for NullBackend {
    fn handles_commitments(&self) -> bool {
        false
    }

    async fn change_commitments(
        &self,
        _request: CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, Error> {
        Ok(CommitmentChangeResponse::default())
    }
}

/// A resource that delegates commitment admission to an external liquid
/// backend over RPC. The transport itself is out of this crate's scope
/// (spec.md §1); this type only shapes the request/response contract so
/// the scheduler can be exercised against a test double.
pub struct DelegatingBackend {
    inner: Box<dyn LiquidBackend>,
}

impl DelegatingBackend {
    pub fn new(inner: Box<dyn LiquidBackend>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LiquidBackend for DelegatingBackend {
    fn handles_commitments(&self) -> bool {
        true
    }

    async fn change_commitments(
        &self,
        request: CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, Error> {
        self.inner.change_commitments(request).await
    }
}
