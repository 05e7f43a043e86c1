//! Escalation rules — authorization paths that grant access outside
//! the base role-permission check.
//!
//! The set of rules is deliberately closed: ownership, creatorship,
//! and team membership. Callers that need to resolve an owner from a
//! resource implement [`OwnerResolver`]; the common case of a resource
//! already loaded in memory uses [`RecordedOwner`].

use taskhive_core::error::TaskhiveResult;
use uuid::Uuid;

/// Resolves the recorded owner (or creator) of a resource.
pub trait OwnerResolver: Send + Sync {
    /// Returns the owning actor's id, or `None` when the resource has
    /// no recorded owner.
    fn resolve_owner(&self) -> impl Future<Output = TaskhiveResult<Option<Uuid>>> + Send;
}

/// Owner taken from a field of an already-loaded resource.
#[derive(Debug, Clone, Copy)]
pub struct RecordedOwner(pub Option<Uuid>);

impl OwnerResolver for RecordedOwner {
    async fn resolve_owner(&self) -> TaskhiveResult<Option<Uuid>> {
        Ok(self.0)
    }
}
