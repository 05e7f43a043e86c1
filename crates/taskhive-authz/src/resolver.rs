//! Permission resolution — the RBAC engine.
//!
//! Checks are denial-biased: absence of an explicit grant, and of
//! every escalation path, denies the action. The single implicit
//! grant is the global-admin permission
//! [`SYSTEM_MANAGE`](taskhive_core::models::permission::SYSTEM_MANAGE),
//! which satisfies every check unconditionally.
//!
//! A missing actor or role resolves to an empty permission set (an
//! audited deny); a storage fault during resolution is an error, so
//! the caller can answer 500 instead of 403.

use std::collections::HashSet;

use serde_json::json;
use taskhive_core::error::{TaskhiveError, TaskhiveResult};
use taskhive_core::models::audit::CreateAuditEvent;
use taskhive_core::models::permission::SYSTEM_MANAGE;
use taskhive_core::repository::{AuditSink, RoleRepository, TeamRepository, UserRepository};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::AuthzError;
use crate::escalation::OwnerResolver;

/// Whether a multi-permission check requires the whole set or any
/// single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    All,
    Any,
}

/// Caller-supplied context attached to denial audit records.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Endpoint or operation identifier (e.g. `tasks.delete`).
    pub operation: Option<String>,
}

impl CheckOptions {
    pub fn operation(op: impl Into<String>) -> Self {
        Self {
            operation: Some(op.into()),
        }
    }
}

/// The RBAC engine.
///
/// Generic over repository implementations so that the authorization
/// layer has no dependency on the database crate.
pub struct PermissionResolver<U, R, T, A>
where
    U: UserRepository,
    R: RoleRepository,
    T: TeamRepository,
    A: AuditSink,
{
    users: U,
    roles: R,
    teams: T,
    audit: A,
}

impl<U, R, T, A> PermissionResolver<U, R, T, A>
where
    U: UserRepository,
    R: RoleRepository,
    T: TeamRepository,
    A: AuditSink,
{
    pub fn new(users: U, roles: R, teams: T, audit: A) -> Self {
        Self {
            users,
            roles,
            teams,
            audit,
        }
    }

    /// Resolves the actor's role and returns the permission names
    /// attached to it. Resolved fresh on every call so role edits
    /// take effect on the next request.
    ///
    /// A missing actor or role yields the empty set; storage faults
    /// propagate as errors.
    pub async fn effective_permissions(&self, actor_id: Uuid) -> TaskhiveResult<HashSet<String>> {
        let user = match self.users.get_by_id(actor_id).await {
            Ok(user) => user,
            Err(TaskhiveError::NotFound { .. }) => {
                debug!(%actor_id, "actor not found during permission resolution");
                return Ok(HashSet::new());
            }
            Err(e) => {
                error!(%actor_id, error = %e, "actor lookup failed during permission resolution");
                return Err(AuthzError::ActorLookup {
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let role = match self.roles.get_by_id(user.role_id).await {
            Ok(role) => role,
            Err(TaskhiveError::NotFound { .. }) => {
                debug!(%actor_id, role_id = %user.role_id, "role not found during permission resolution");
                return Ok(HashSet::new());
            }
            Err(e) => {
                error!(%actor_id, role_id = %user.role_id, error = %e, "role lookup failed during permission resolution");
                return Err(AuthzError::RoleLookup {
                    reason: e.to_string(),
                }
                .into());
            }
        };

        Ok(role.permissions.into_iter().collect())
    }

    /// Base permission check: true if the effective set covers the
    /// required permissions (per `mode`), or the actor holds the
    /// global-admin permission. Denials are audited.
    pub async fn check(
        &self,
        actor_id: Uuid,
        required: &[&str],
        mode: CheckMode,
        opts: &CheckOptions,
    ) -> TaskhiveResult<bool> {
        let effective = self.effective_permissions(actor_id).await?;

        if effective.contains(SYSTEM_MANAGE) {
            return Ok(true);
        }

        let granted = match mode {
            CheckMode::All => required.iter().all(|p| effective.contains(*p)),
            CheckMode::Any => required.iter().any(|p| effective.contains(*p)),
        };

        if !granted {
            self.audit_denial(actor_id, required, "permission", opts)
                .await;
        }
        Ok(granted)
    }

    /// Ownership escalation: the recorded owner may always act on
    /// their own resource; anyone else falls back to the base check
    /// with `fallback_permission`.
    pub async fn check_ownership(
        &self,
        actor_id: Uuid,
        owner: &impl OwnerResolver,
        fallback_permission: &str,
        opts: &CheckOptions,
    ) -> TaskhiveResult<bool> {
        if let Some(owner_id) = owner.resolve_owner().await? {
            if owner_id == actor_id {
                return Ok(true);
            }
        }

        let effective = self.effective_permissions(actor_id).await?;
        if effective.contains(SYSTEM_MANAGE) || effective.contains(fallback_permission) {
            return Ok(true);
        }

        self.audit_denial(actor_id, &[fallback_permission], "ownership", opts)
            .await;
        Ok(false)
    }

    /// Creator-only escalation: the recorded creator may act, as may
    /// anyone holding the resource family's manage permission
    /// (`{prefix}:manage`) or the global-admin permission.
    pub async fn check_creator_only(
        &self,
        actor_id: Uuid,
        creator: &impl OwnerResolver,
        manage_prefix: &str,
        opts: &CheckOptions,
    ) -> TaskhiveResult<bool> {
        if let Some(creator_id) = creator.resolve_owner().await? {
            if creator_id == actor_id {
                return Ok(true);
            }
        }

        let manage = format!("{manage_prefix}:manage");
        let effective = self.effective_permissions(actor_id).await?;
        if effective.contains(SYSTEM_MANAGE) || effective.contains(manage.as_str()) {
            return Ok(true);
        }

        self.audit_denial(actor_id, &[manage.as_str()], "creator_only", opts)
            .await;
        Ok(false)
    }

    /// Team-membership escalation: true iff the actor appears in the
    /// team's member list (the owner counts as a member).
    pub async fn check_team_membership(
        &self,
        actor_id: Uuid,
        team_id: Uuid,
        opts: &CheckOptions,
    ) -> TaskhiveResult<bool> {
        let member = match self.teams.is_member(team_id, actor_id).await {
            Ok(member) => member,
            Err(TaskhiveError::NotFound { .. }) => {
                debug!(%team_id, "team not found during membership check");
                false
            }
            Err(e) => {
                error!(%team_id, error = %e, "team lookup failed during membership check");
                return Err(AuthzError::TeamLookup {
                    reason: e.to_string(),
                }
                .into());
            }
        };

        if !member {
            self.audit_denial(actor_id, &[], "team_membership", opts)
                .await;
        }
        Ok(member)
    }

    async fn audit_denial(
        &self,
        actor_id: Uuid,
        required: &[&str],
        variant: &str,
        opts: &CheckOptions,
    ) {
        self.audit
            .record(CreateAuditEvent {
                organization_id: None,
                user_id: actor_id,
                action: "permission.denied".into(),
                entity_type: "authorization".into(),
                entity_id: None,
                details: json!({
                    "required": required,
                    "variant": variant,
                    "operation": opts.operation,
                }),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use taskhive_core::models::role::{CreateRole, Role, UpdateRole};
    use taskhive_core::models::team::{CreateTeam, Team, TeamMemberRole};
    use taskhive_core::models::user::{CreateUser, UpdateUser, User};
    use taskhive_core::repository::{PaginatedResult, Pagination};

    use super::*;

    /// A store whose every lookup fails, as if the database were down.
    struct DownStore;

    fn fault() -> TaskhiveError {
        TaskhiveError::Database("connection reset".into())
    }

    impl UserRepository for DownStore {
        async fn create(&self, _input: CreateUser) -> TaskhiveResult<User> {
            Err(fault())
        }
        async fn get_by_id(&self, _id: Uuid) -> TaskhiveResult<User> {
            Err(fault())
        }
        async fn get_by_email(&self, _email: &str) -> TaskhiveResult<User> {
            Err(fault())
        }
        async fn update(&self, _id: Uuid, _input: UpdateUser) -> TaskhiveResult<User> {
            Err(fault())
        }
        async fn list(&self, _pagination: Pagination) -> TaskhiveResult<PaginatedResult<User>> {
            Err(fault())
        }
    }

    impl RoleRepository for DownStore {
        async fn upsert(&self, _input: CreateRole) -> TaskhiveResult<Role> {
            Err(fault())
        }
        async fn get_by_id(&self, _id: Uuid) -> TaskhiveResult<Role> {
            Err(fault())
        }
        async fn get_by_name(&self, _name: &str) -> TaskhiveResult<Role> {
            Err(fault())
        }
        async fn update(&self, _id: Uuid, _input: UpdateRole) -> TaskhiveResult<Role> {
            Err(fault())
        }
        async fn list(&self) -> TaskhiveResult<Vec<Role>> {
            Err(fault())
        }
    }

    impl TeamRepository for DownStore {
        async fn create(&self, _input: CreateTeam) -> TaskhiveResult<Team> {
            Err(fault())
        }
        async fn get_by_id(&self, _id: Uuid) -> TaskhiveResult<Team> {
            Err(fault())
        }
        async fn add_member(
            &self,
            _team_id: Uuid,
            _user_id: Uuid,
            _role: TeamMemberRole,
        ) -> TaskhiveResult<Team> {
            Err(fault())
        }
        async fn remove_member(&self, _team_id: Uuid, _user_id: Uuid) -> TaskhiveResult<Team> {
            Err(fault())
        }
        async fn is_member(&self, _team_id: Uuid, _user_id: Uuid) -> TaskhiveResult<bool> {
            Err(fault())
        }
    }

    impl AuditSink for DownStore {
        async fn record(&self, _event: CreateAuditEvent) {}
    }

    fn resolver() -> PermissionResolver<DownStore, DownStore, DownStore, DownStore> {
        PermissionResolver::new(DownStore, DownStore, DownStore, DownStore)
    }

    #[tokio::test]
    async fn actor_lookup_fault_is_an_error_not_a_deny() {
        let result = resolver()
            .check(
                Uuid::new_v4(),
                &["task:delete"],
                CheckMode::All,
                &CheckOptions::default(),
            )
            .await;
        match result {
            Err(TaskhiveError::Lookup { entity, .. }) => assert_eq!(entity, "user"),
            other => panic!("expected a lookup error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn team_lookup_fault_is_an_error_not_a_deny() {
        let result = resolver()
            .check_team_membership(Uuid::new_v4(), Uuid::new_v4(), &CheckOptions::default())
            .await;
        match result {
            Err(TaskhiveError::Lookup { entity, .. }) => assert_eq!(entity, "team"),
            other => panic!("expected a lookup error, got {other:?}"),
        }
    }
}
