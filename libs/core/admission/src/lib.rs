// [libs/core/admission/src/lib.rs]
//! `AdmissionPredicate` and `FairDistributor`:
//! the two pure-function primitives the rest of the control plane is built
//! on. Neither touches a clock, a database, or randomness — every input is
//! a value, every output is a value, and identical inputs always produce
//! identical outputs.

mod admission;
mod fair;

pub use admission::can_accept_commitment_changes;
pub use fair::distribute_fairly;
