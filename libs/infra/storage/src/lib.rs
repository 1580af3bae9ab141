// [libs/infra/storage/src/lib.rs]
//! `libsql`-backed persistence for the quota-and-commitment control plane.
//! Implements `quotaward_core_scheduler::CommitmentStoragePort`; owns the
//! schema (§6) and the AllocationStats loader (§4.1).

mod client;
mod errors;
mod queries;
mod repository;
mod schema;

pub use client::StorageClient;
pub use errors::DbError;
pub use repository::{delete_az_resource_if_unreferenced, LibsqlCommitmentRepository};
