//! Ambient tenant context carrier.
//!
//! The original design requirement: once a request is authenticated,
//! every data access made while handling it must be scoped to the
//! request's organization without threading an id through every
//! function signature. A tokio task-local gives exactly that: one
//! private "global" per logical request, with hard isolation between
//! concurrently executing requests.

use uuid::Uuid;

tokio::task_local! {
    static CURRENT_TENANT: Uuid;
}

/// Runs `fut` with `organization_id` as the ambient tenant.
///
/// All code awaited transitively within `fut` observes the id via
/// [`current_tenant`]. Establishment is re-entrant; the innermost
/// scope wins for code run inside it, and the outer value is restored
/// afterwards.
///
/// Task-locals do not cross `tokio::spawn`: a handler that spawns
/// background work must re-establish the scope inside the spawned
/// task, otherwise scoped operations there fail closed.
pub async fn with_tenant<F>(organization_id: Uuid, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(organization_id, fut).await
}

/// Returns the ambient tenant, or `None` outside any established
/// scope. Never returns another request's value.
pub fn current_tenant() -> Option<Uuid> {
    CURRENT_TENANT.try_with(|id| *id).ok()
}
