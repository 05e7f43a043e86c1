//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The distinguished global-admin permission. Holding it satisfies
/// every permission check unconditionally; it is the only implicit
/// grant in the system.
pub const SYSTEM_MANAGE: &str = "system:manage";

/// An immutable catalog entry.
///
/// Permissions are created by the catalog bootstrap and never edited
/// by users. The `name` (`resource:action`, e.g. `task:read`) is
/// globally unique and is what roles reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    /// Resource category (e.g., `task`, `team`, `all`).
    pub resource: String,
    /// Action verb (e.g., `read`, `manage`).
    pub action: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog entry payload for the bootstrap upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: String,
}
