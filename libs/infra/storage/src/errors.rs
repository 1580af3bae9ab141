// [libs/infra/storage/src/errors.rs]
use thiserror::Error;

/// Storage-layer error catalog, one variant per failure shape a
/// repository can hit (§7's `DataError`/`TransientBackendError` mapped
/// onto the concrete libsql boundary).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database connection failed: {0}")]
    ConnectionError(String),

    #[error("query failed: {0}")]
    QueryError(#[from] libsql::Error),

    /// A row didn't map onto its domain type — an unparseable historical
    /// usage series, an unrecognized status string, etc. Per §4.1 this is
    /// non-fatal to the caller: the offending resource is skipped and the
    /// pass continues.
    #[error("row mapping failed: {0}")]
    MappingError(String),

    #[error("expected row not found")]
    NotFound,

    /// The cascade-delete guard on `cluster_az_resources` (§6) refused a
    /// delete because active (non-terminal) commitments still reference
    /// the row.
    #[error("conflict: {0}")]
    Conflict(String),
}
