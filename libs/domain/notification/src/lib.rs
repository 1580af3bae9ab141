// [libs/domain/notification/src/lib.rs]
//! Mail-notification value types and the `MailSink` port.
//!
//! Mail rendering and delivery are an external collaborator per spec.md
//! §1 — this crate models the boundary (what gets sent, to whom, about
//! what) without rendering a template or speaking SMTP. A pass collates
//! every commitment it confirmed or consumed via transfer into at most
//! one message per project per action category (§4.7 step 5) and hands
//! the result to a `MailSink`.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotaward_domain_models::{Commitment, ProjectId};
use serde::{Deserialize, Serialize};

/// Which action a notification is reporting. A commitment confirmed and
/// then consumed by a transfer within the same pass reports only
/// `TransferConsumed` — §4.7 step 5's deduplication rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationCategory {
    Confirmed,
    TransferConsumed,
}

/// One commitment's worth of detail inside a collated notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentNotice {
    pub commitment_id: uuid::Uuid,
    pub amount: u64,
    pub resource_name: String,
    pub az: String,
}

impl CommitmentNotice {
    pub fn from_commitment(commitment: &Commitment) -> Self {
        Self {
            commitment_id: commitment.id,
            amount: commitment.amount,
            resource_name: commitment.resource_name.0.clone(),
            az: commitment.az.to_string(),
        }
    }
}

/// A single outbound notification: one project, one action category, every
/// commitment that pass touched for that project and category collated
/// together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailNotification {
    pub project_id: ProjectId,
    pub category: NotificationCategory,
    pub commitments: Vec<CommitmentNotice>,
    pub generated_at: DateTime<Utc>,
}

/// External collaborator boundary for mail delivery. Implementations
/// render a template and hand the message to an SMTP relay or equivalent;
/// this crate only builds the `MailNotification` value.
#[async_trait]
pub trait MailSink: Send + Sync {
    async fn send(&self, notification: &MailNotification) -> Result<(), MailSinkError>;
}

#[derive(Debug, thiserror::Error)]
#[error("mail sink delivery failed: {0}")]
pub struct MailSinkError(pub String);

/// Test/demo double that records notifications instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingMailSink {
    pub sent: std::sync::Mutex<Vec<MailNotification>>,
}

#[async_trait]
impl MailSink for RecordingMailSink {
    async fn send(&self, notification: &MailNotification) -> Result<(), MailSinkError> {
        self.sent
            .lock()
            .map_err(|_| MailSinkError("recording sink lock poisoned".into()))?
            .push(notification.clone());
        Ok(())
    }
}
