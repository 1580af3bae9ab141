// [libs/infra/storage/src/schema.rs]
//! Idempotent schema bootstrap for the tables spec.md §6 names. Every
//! statement is `CREATE TABLE IF NOT EXISTS` — migration tooling beyond
//! that is out of scope (spec.md §1).

use libsql::Connection;
use tracing::{debug, instrument};

use crate::errors::DbError;

const TABLES: &[(&str, &str)] = &[
    (
        "cluster_services",
        r#"
        CREATE TABLE IF NOT EXISTS cluster_services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL UNIQUE
        );
    "#,
    ),
    (
        "cluster_resources",
        r#"
        CREATE TABLE IF NOT EXISTS cluster_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            service_id INTEGER NOT NULL REFERENCES cluster_services(id),
            name TEXT NOT NULL,
            topology TEXT NOT NULL,
            has_quota INTEGER NOT NULL,
            has_capacity INTEGER NOT NULL,
            UNIQUE(service_id, name)
        );
    "#,
    ),
    (
        "cluster_az_resources",
        r#"
        CREATE TABLE IF NOT EXISTS cluster_az_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_id INTEGER NOT NULL REFERENCES cluster_resources(id),
            az TEXT NOT NULL,
            raw_capacity INTEGER NOT NULL DEFAULT 0,
            usage INTEGER,
            last_nonzero_raw_capacity INTEGER,
            UNIQUE(resource_id, az)
        );
    "#,
    ),
    (
        "domains",
        r#"
        CREATE TABLE IF NOT EXISTS domains (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );
    "#,
    ),
    (
        "projects",
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            domain_id INTEGER NOT NULL REFERENCES domains(id),
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            parent_uuid TEXT
        );
    "#,
    ),
    (
        "project_services",
        r#"
        CREATE TABLE IF NOT EXISTS project_services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            service_id INTEGER NOT NULL REFERENCES cluster_services(id),
            next_scrape_at DATETIME,
            quota_desynced_at DATETIME,
            stale INTEGER NOT NULL DEFAULT 0,
            UNIQUE(project_id, service_id)
        );
    "#,
    ),
    (
        "project_resources",
        r#"
        CREATE TABLE IF NOT EXISTS project_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            resource_id INTEGER NOT NULL REFERENCES cluster_resources(id),
            quota INTEGER,
            backend_quota INTEGER,
            forbidden INTEGER NOT NULL DEFAULT 0,
            max_quota_from_outside_admin INTEGER,
            max_quota_from_local_admin INTEGER,
            override_quota_from_config INTEGER,
            UNIQUE(project_id, resource_id)
        );
    "#,
    ),
    (
        "project_az_resources",
        r#"
        CREATE TABLE IF NOT EXISTS project_az_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            az_resource_id INTEGER NOT NULL REFERENCES cluster_az_resources(id),
            quota INTEGER,
            usage INTEGER NOT NULL DEFAULT 0,
            historical_usage TEXT,
            UNIQUE(project_id, az_resource_id)
        );
    "#,
    ),
    (
        "project_commitments",
        r#"
        CREATE TABLE IF NOT EXISTS project_commitments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            az_resource_id INTEGER NOT NULL REFERENCES cluster_az_resources(id),
            status TEXT NOT NULL,
            amount INTEGER NOT NULL,
            duration_seconds INTEGER NOT NULL,
            created_at DATETIME NOT NULL,
            creator_uuid TEXT NOT NULL,
            creator_name TEXT NOT NULL,
            confirm_by DATETIME,
            confirmed_at DATETIME,
            expires_at DATETIME NOT NULL,
            superseded_at DATETIME,
            transfer_status TEXT NOT NULL DEFAULT 'none',
            transfer_token TEXT UNIQUE,
            transfer_started_at DATETIME,
            creation_context_json TEXT NOT NULL,
            supersede_context_json TEXT
        );
    "#,
    ),
];

/// Applies every table's `CREATE TABLE IF NOT EXISTS` statement. Safe to
/// call on every process start, including against an already-bootstrapped
/// database.
#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<(), DbError> {
    for (name, statement) in TABLES {
        debug!(table = name, "ensuring table exists");
        connection.execute(statement, ()).await?;
    }
    Ok(())
}
