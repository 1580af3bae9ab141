// [libs/core/commitments/src/lib.rs]
//! The lifecycle of a single commitment record (`CommitmentStateMachine`,
//! §4.5) and the per-location pool of offered commitments a pending
//! commitment can be satisfied from (`TransferableCache`, §4.6).

mod clock;
mod errors;
mod state_machine;
mod transferable;

pub use clock::{Clock, FixedClock, IdSource, SequentialIdSource, SystemClock, SystemIdSource};
pub use errors::Error;
pub use state_machine::{CommitmentStateMachine, SELF_SERVICE_DELETE_WINDOW};
pub use transferable::{ConsumptionOutcome, TransferableCache};
