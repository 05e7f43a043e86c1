//! Database-specific error types and conversions.

use taskhive_core::error::TaskhiveError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A tenant-scoped operation was attempted with no ambient tenant
    /// context and no explicit bypass. Rejected before reaching storage.
    #[error("Scoping violation on collection `{collection}`")]
    ScopingViolation { collection: String },

    /// The collection is in neither the scoped nor the global
    /// allow-list.
    #[error("Collection `{collection}` is not registered for scoping")]
    UnknownCollection { collection: String },
}

impl From<DbError> for TaskhiveError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TaskhiveError::NotFound { entity, id },
            DbError::ScopingViolation { collection } => {
                TaskhiveError::ScopingViolation { collection }
            }
            DbError::UnknownCollection { collection } => TaskhiveError::Validation {
                message: format!("unregistered collection `{collection}`"),
            },
            other => TaskhiveError::Database(other.to_string()),
        }
    }
}
