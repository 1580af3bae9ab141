// [libs/core/scheduler/src/errors.rs]
use thiserror::Error;

use quotaward_core_commitments::Error as CommitmentError;

/// Errors a `ConfirmationScheduler` pass can surface. Per spec.md §7,
/// `AdmissionRejected` is *not* a variant here — a rejection is a normal
/// boolean outcome the scheduler acts on by skipping a commitment, never
/// an exception. `InvalidTransition` (wrapped from the commitments crate)
/// is the one variant that indicates a programmer error rather than an
/// environmental failure; callers should treat it as fatal rather than
/// retry the pass.
#[derive(Debug, Error)]
pub enum Error {
    #[error("commitment state transition failed: {0}")]
    Commitment(#[from] CommitmentError),

    /// I/O failure talking to storage or a liquid backend. The pass
    /// aborts; the caller's scheduling loop retries on the next interval.
    #[error("transient backend error: {0}")]
    TransientBackend(String),

    /// A `HandlesCommitments` backend rejected the proposed change, or an
    /// RPC to it timed out (treated as equivalent per §6).
    #[error("backend rejected commitment change: {0}")]
    BackendRejected(String),
}
