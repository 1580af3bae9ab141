// [libs/infra/storage/src/client.rs]
use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{info, instrument};

use crate::errors::DbError;
use crate::schema::apply_schema;

/// Thin wrapper around a `libsql::Database`, bootstrapping the schema on
/// connect and handing out fresh connections to repositories. Mirrors the
/// teacher's connection-client shape: one long-lived driver, short-lived
/// per-call connections.
#[derive(Clone)]
pub struct StorageClient {
    database: Arc<Database>,
}

impl StorageClient {
    #[instrument(skip(access_token))]
    pub async fn connect(url: &str, access_token: Option<String>) -> Result<Self, DbError> {
        if url.is_empty() {
            return Err(DbError::ConnectionError("database url is empty".into()));
        }

        info!(url, "connecting to storage backend");

        let is_remote = url.starts_with("libsql://") || url.starts_with("https://");
        let database = if is_remote {
            let token = access_token
                .ok_or_else(|| DbError::ConnectionError("remote url requires an access token".into()))?;
            Builder::new_remote(url.to_string(), token)
                .build()
                .await
                .map_err(|e| DbError::ConnectionError(e.to_string()))?
        } else {
            Builder::new_local(url)
                .build()
                .await
                .map_err(|e| DbError::ConnectionError(e.to_string()))?
        };

        let bootstrap = database
            .connect()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        apply_schema(&bootstrap).await?;

        Ok(Self {
            database: Arc::new(database),
        })
    }

    pub fn connection(&self) -> Result<Connection, DbError> {
        self.database.connect().map_err(|e| DbError::ConnectionError(e.to_string()))
    }
}
