//! Audit event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only audit record. Written for permission denials and
/// sensitive mutations; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    /// e.g. `permission.denied`, `created`, `deleted`.
    pub action: String,
    /// e.g. `task`, `team`, `authorization`.
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    /// Free-form context (required permissions, check variant, ...).
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending an audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEvent {
    /// Stamped from the ambient tenant context when `None`.
    pub organization_id: Option<Uuid>,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
}
