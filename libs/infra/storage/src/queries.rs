// [libs/infra/storage/src/queries.rs]
//! SQL text shared by the repositories, kept in one place the way the
//! teacher's `job/queries.rs` does.

pub const FIND_LOCATION_IDS: &str = r#"
    SELECT car.id
    FROM cluster_az_resources car
    JOIN cluster_resources cr ON cr.id = car.resource_id
    JOIN cluster_services cs ON cs.id = cr.service_id
    WHERE cs.type = ?1 AND cr.name = ?2 AND car.az = ?3
"#;

pub const LOAD_PENDING_COMMITMENTS: &str = r#"
    SELECT pc.uuid, p.uuid, pc.amount, pc.duration_seconds, pc.status,
           pc.transfer_status, pc.transfer_token, pc.creator_uuid, pc.creator_name,
           pc.created_at, pc.confirm_by, pc.confirmed_at, pc.expires_at,
           pc.superseded_at, pc.transfer_started_at,
           pc.creation_context_json, pc.supersede_context_json
    FROM project_commitments pc
    JOIN projects p ON p.id = pc.project_id
    WHERE pc.az_resource_id = ?1 AND pc.status = 'pending'
    ORDER BY pc.created_at ASC, pc.confirm_by ASC, pc.uuid ASC
"#;

pub const LOAD_TRANSFER_OFFERS: &str = r#"
    SELECT pc.uuid, p.uuid, pc.amount, pc.duration_seconds, pc.status,
           pc.transfer_status, pc.transfer_token, pc.creator_uuid, pc.creator_name,
           pc.created_at, pc.confirm_by, pc.confirmed_at, pc.expires_at,
           pc.superseded_at, pc.transfer_started_at,
           pc.creation_context_json, pc.supersede_context_json
    FROM project_commitments pc
    JOIN projects p ON p.id = pc.project_id
    WHERE pc.az_resource_id = ?1
      AND pc.transfer_status = 'public'
      AND pc.status NOT IN ('superseded', 'expired')
    ORDER BY pc.transfer_started_at ASC, pc.created_at ASC, pc.uuid ASC
"#;

pub const UPSERT_COMMITMENT: &str = r#"
    INSERT INTO project_commitments (
        uuid, project_id, az_resource_id, status, amount, duration_seconds,
        created_at, creator_uuid, creator_name, confirm_by, confirmed_at,
        expires_at, superseded_at, transfer_status, transfer_token,
        transfer_started_at, creation_context_json, supersede_context_json
    ) VALUES (
        ?1, (SELECT id FROM projects WHERE uuid = ?2), ?3, ?4, ?5, ?6,
        ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
    )
    ON CONFLICT(uuid) DO UPDATE SET
        status = excluded.status,
        amount = excluded.amount,
        confirmed_at = excluded.confirmed_at,
        superseded_at = excluded.superseded_at,
        transfer_status = excluded.transfer_status,
        transfer_token = excluded.transfer_token,
        transfer_started_at = excluded.transfer_started_at,
        supersede_context_json = excluded.supersede_context_json
"#;

pub const LOAD_AZ_CAPACITY: &str = r#"
    SELECT raw_capacity, last_nonzero_raw_capacity
    FROM cluster_az_resources
    WHERE id = ?1
"#;

pub const LOAD_PROJECT_AZ_STATS: &str = r#"
    SELECT p.uuid, par.usage, par.historical_usage,
           COALESCE((
               SELECT SUM(amount) FROM project_commitments pc2
               WHERE pc2.az_resource_id = par.az_resource_id
                 AND pc2.project_id = par.project_id
                 AND pc2.status = 'confirmed'
           ), 0)
    FROM project_az_resources par
    JOIN projects p ON p.id = par.project_id
    WHERE par.az_resource_id = ?1
"#;

/// The cascade-delete guard for `cluster_az_resources` (§6): only rows
/// with no active (non-terminal) commitment left may be deleted.
pub const COUNT_ACTIVE_COMMITMENTS_FOR_AZ: &str = r#"
    SELECT COUNT(*) FROM project_commitments
    WHERE az_resource_id = ?1 AND status NOT IN ('superseded', 'expired')
"#;

pub const DELETE_TERMINAL_COMMITMENTS_FOR_AZ: &str = r#"
    DELETE FROM project_commitments
    WHERE az_resource_id = ?1 AND status IN ('superseded', 'expired')
"#;

pub const DELETE_AZ_RESOURCE: &str = r#"
    DELETE FROM cluster_az_resources WHERE id = ?1
"#;
