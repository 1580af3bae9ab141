// [libs/core/scheduler/src/audit.rs]
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quotaward_domain_models::ProjectId;

/// The two action categories a pass reports, one audit event per
/// `(project, category)` per pass (§4.7 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditCategory {
    Confirm,
    Consume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub project_id: ProjectId,
    pub category: AuditCategory,
    pub commitment_ids: Vec<Uuid>,
    pub generated_at: DateTime<Utc>,
}

/// External collaborator boundary for the audit sink (spec.md §1 treats
/// "audit sink" as out of scope; this crate only builds the event).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError>;
}

#[derive(Debug, thiserror::Error)]
#[error("audit sink write failed: {0}")]
pub struct AuditSinkError(pub String);

/// Test/demo double that records events instead of writing to a sink.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    pub recorded: std::sync::Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        self.recorded
            .lock()
            .map_err(|_| AuditSinkError("recording sink lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}
