//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Timestamps the application
//! writes itself (lockout expiry, membership join times) are stored
//! as RFC 3339 strings; database-managed timestamps use `datetime`
//! with `time::now()` defaults. Business-feature collections
//! (`task`, `notification`) are SCHEMALESS: their shape belongs to the
//! surrounding application, this core only scopes them.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (global scope, tenant root)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD status ON TABLE organization TYPE string \
    ASSERT $value IN ['active', 'suspended', 'deleted'];
DEFINE FIELD limits ON TABLE organization TYPE object;
DEFINE FIELD limits.max_users ON TABLE organization TYPE int DEFAULT 10;
DEFINE FIELD limits.max_teams ON TABLE organization TYPE int DEFAULT 5;
DEFINE FIELD limits.max_storage ON TABLE organization TYPE int \
    DEFAULT 5368709120;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Permissions (global scope, immutable catalog)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD resource ON TABLE permission TYPE string;
DEFINE FIELD action ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Roles (global scope; tenant-private custom roles carry an owner)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD permissions ON TABLE role TYPE array;
DEFINE FIELD permissions.* ON TABLE role TYPE string;
DEFINE FIELD is_system ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD organization_id ON TABLE role TYPE option<string>;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_org_name ON TABLE role \
    COLUMNS organization_id, name UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role_id ON TABLE user TYPE string;
DEFINE FIELD team_ids ON TABLE user TYPE array;
DEFINE FIELD team_ids.* ON TABLE user TYPE string;
DEFINE FIELD avatar_url ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD failed_login_attempts ON TABLE user TYPE int DEFAULT 0;
DEFINE FIELD lockout_until ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_org_email ON TABLE user \
    COLUMNS organization_id, email UNIQUE;

-- =======================================================================
-- Teams (tenant scope, embedded membership)
-- =======================================================================
DEFINE TABLE team SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE team TYPE string;
DEFINE FIELD name ON TABLE team TYPE string;
DEFINE FIELD description ON TABLE team TYPE string DEFAULT '';
DEFINE FIELD owner_id ON TABLE team TYPE string;
DEFINE FIELD members ON TABLE team TYPE array;
DEFINE FIELD members.* ON TABLE team TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE team TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE team TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_team_org_name ON TABLE team \
    COLUMNS organization_id, name;

-- =======================================================================
-- Settings (tenant scope; global-scope records carry no owner)
-- =======================================================================
DEFINE TABLE setting SCHEMAFULL;
DEFINE FIELD key ON TABLE setting TYPE string;
DEFINE FIELD value ON TABLE setting TYPE any;
DEFINE FIELD description ON TABLE setting TYPE string DEFAULT '';
DEFINE FIELD category ON TABLE setting TYPE string \
    ASSERT $value IN ['email', 'security', 'general', 'maintenance'];
DEFINE FIELD is_secret ON TABLE setting TYPE bool DEFAULT false;
DEFINE FIELD scope ON TABLE setting TYPE string \
    ASSERT $value IN ['global', 'organization'];
DEFINE FIELD organization_id ON TABLE setting TYPE option<string>;
DEFINE FIELD created_at ON TABLE setting TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE setting TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_setting_org_key ON TABLE setting \
    COLUMNS organization_id, key UNIQUE;

-- =======================================================================
-- Activity log (tenant scope, append-only)
-- =======================================================================
DEFINE TABLE activity_log SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE activity_log TYPE string;
DEFINE FIELD user_id ON TABLE activity_log TYPE string;
DEFINE FIELD action ON TABLE activity_log TYPE string;
DEFINE FIELD entity_type ON TABLE activity_log TYPE string;
DEFINE FIELD entity_id ON TABLE activity_log TYPE option<string>;
DEFINE FIELD details ON TABLE activity_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE activity_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_activity_entity ON TABLE activity_log \
    COLUMNS entity_type, entity_id, created_at;

-- =======================================================================
-- Business-feature collections (scoped, shape owned elsewhere)
-- =======================================================================
DEFINE TABLE task SCHEMALESS;
DEFINE TABLE notification SCHEMALESS;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
