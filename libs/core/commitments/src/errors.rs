// [libs/core/commitments/src/errors.rs]
use thiserror::Error;
use uuid::Uuid;

use quotaward_domain_models::{CommitmentStatus, ProjectId};

/// Errors raised by `CommitmentStateMachine` and `TransferableCache`.
///
/// `InvalidTransition` marks a programmer error, per spec.md §7: it
/// indicates an invariant breach (a caller attempted a transition the
/// lifecycle doesn't allow) rather than a normal negative outcome, and
/// callers at the scheduler boundary should treat it as fatal rather than
/// retry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("commitment {commitment} cannot move from {from:?} via this operation")]
    InvalidTransition { commitment: Uuid, from: CommitmentStatus },

    #[error("commitment {0} is not Pending")]
    NotPending(Uuid),

    #[error("commitment {commitment} cannot be transferred within its own project {project}")]
    SelfTransfer { commitment: Uuid, project: ProjectId },

    #[error("commitment {0} has no outstanding transfer offer to withdraw")]
    NotOffered(Uuid),
}
