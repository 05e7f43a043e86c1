//! Organization domain model.
//!
//! Organizations are the tenant root: every tenant-scoped entity
//! carries the id of exactly one organization, set at creation and
//! immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Suspended,
    Deleted,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::Active => "active",
            OrganizationStatus::Suspended => "suspended",
            OrganizationStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(OrganizationStatus::Active),
            "suspended" => Some(OrganizationStatus::Suspended),
            "deleted" => Some(OrganizationStatus::Deleted),
            _ => None,
        }
    }
}

/// Per-organization resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationLimits {
    pub max_users: u32,
    pub max_teams: u32,
    /// Storage quota in bytes.
    pub max_storage: u64,
}

impl Default for OrganizationLimits {
    fn default() -> Self {
        Self {
            max_users: 10,
            max_teams: 5,
            max_storage: 5_368_709_120,
        }
    }
}

/// An isolated customer account; the root of tenant isolation.
///
/// Created once at signup, mutated rarely, and never hard-deleted in
/// the common path (status moves to `deleted` instead).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Human-readable display name.
    pub name: String,
    /// URL-safe globally unique identifier (e.g., `acme-corp`).
    pub slug: String,
    pub status: OrganizationStatus,
    pub limits: OrganizationLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub limits: Option<OrganizationLimits>,
}

/// Fields that can be updated on an existing organization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub status: Option<OrganizationStatus>,
    pub limits: Option<OrganizationLimits>,
}
