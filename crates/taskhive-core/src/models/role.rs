//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named set of permissions; the sole source of an actor's
/// permissions in the base model.
///
/// System roles (`is_system = true`) have no owning organization and
/// are shared across tenants; custom roles belong to exactly one
/// organization. Name uniqueness is scoped separately for each group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Permission names (catalog names are globally unique).
    pub permissions: Vec<String>,
    pub is_system: bool,
    /// Owning tenant for custom roles; `None` iff `is_system`.
    pub organization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_system: bool,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}
