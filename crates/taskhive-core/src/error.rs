//! Error types for the TaskHive core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskhiveError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Tenant scoping violation: operation on `{collection}` with no ambient tenant and no bypass")]
    ScopingViolation { collection: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Actor/role/team resolution failed for an infrastructure reason.
    /// Distinct from a genuine denial so the request layer can answer
    /// 500 rather than 403.
    #[error("Lookup failure resolving {entity}: {reason}")]
    Lookup { entity: String, reason: String },

    #[error("Settings unavailable for key `{key}`")]
    SettingsUnavailable { key: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type TaskhiveResult<T> = Result<T, TaskhiveError>;
