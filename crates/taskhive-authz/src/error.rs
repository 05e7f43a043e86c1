//! Authorization error types.
//!
//! A failed lookup during resolution is deliberately kept apart from
//! a genuine denial: a denial is an `Ok(false)` from the resolver,
//! while a storage fault surfaces as an error so operators can tell
//! "no access" from "system problem".

use taskhive_core::error::TaskhiveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("actor lookup failed: {reason}")]
    ActorLookup { reason: String },

    #[error("role lookup failed: {reason}")]
    RoleLookup { reason: String },

    #[error("team lookup failed: {reason}")]
    TeamLookup { reason: String },
}

impl From<AuthzError> for TaskhiveError {
    fn from(err: AuthzError) -> Self {
        let entity = match err {
            AuthzError::ActorLookup { .. } => "user",
            AuthzError::RoleLookup { .. } => "role",
            AuthzError::TeamLookup { .. } => "team",
        };
        TaskhiveError::Lookup {
            entity: entity.into(),
            reason: err.to_string(),
        }
    }
}
