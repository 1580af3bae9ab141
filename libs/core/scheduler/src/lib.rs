// [libs/core/scheduler/src/lib.rs]
//! `ConfirmationScheduler` (§4.7): for one `(service, resource, AZ)`
//! location, walks pending commitments in creation order, asks
//! `AdmissionPredicate` and `TransferableCache` whether each one fits, and
//! emits the confirmed/superseded records plus the collated mail and
//! audit output. Storage and liquid-backend RPC are reached only through
//! the `CommitmentStoragePort` / `LiquidBackend` traits — this crate
//! never speaks SQL or HTTP directly.

mod audit;
mod errors;
mod liquid_backend;
mod port;
mod scheduler;

pub use audit::{AuditCategory, AuditEvent, AuditSink, AuditSinkError, RecordingAuditSink};
pub use errors::Error;
pub use liquid_backend::{
    CommitmentChangeRequest, CommitmentChangeResponse, CommitmentTransition, DelegatingBackend,
    LiquidBackend, NullBackend,
};
pub use port::{CommitmentStoragePort, Location};
pub use scheduler::{ConfirmationScheduler, PassReport};
