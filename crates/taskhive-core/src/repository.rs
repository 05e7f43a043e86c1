//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories do
//! NOT take a tenant parameter: implementations must scope every
//! operation to the ambient tenant established with
//! [`crate::context::with_tenant`], failing closed when none is set.
//! Business logic is constructor-injected with these traits and never
//! holds a raw storage handle.

use uuid::Uuid;

use crate::error::TaskhiveResult;
use crate::models::{
    audit::CreateAuditEvent,
    organization::{CreateOrganization, Organization, UpdateOrganization},
    permission::{CreatePermission, Permission},
    role::{CreateRole, Role, UpdateRole},
    setting::{Setting, SettingCategory, UpsertSetting},
    team::{CreateTeam, Team, TeamMemberRole},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Globally-shared entities (never auto-scoped)
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = TaskhiveResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TaskhiveResult<Organization>> + Send;
    fn get_by_slug(&self, slug: &str)
    -> impl Future<Output = TaskhiveResult<Organization>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrganization,
    ) -> impl Future<Output = TaskhiveResult<Organization>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = TaskhiveResult<PaginatedResult<Organization>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    /// Idempotent catalog upsert, keyed by permission name.
    fn upsert(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = TaskhiveResult<Permission>> + Send;
    fn get_by_name(&self, name: &str)
    -> impl Future<Output = TaskhiveResult<Permission>> + Send;
    fn list_all(&self) -> impl Future<Output = TaskhiveResult<Vec<Permission>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    /// Idempotent upsert keyed by name (within the system/tenant group).
    fn upsert(&self, input: CreateRole) -> impl Future<Output = TaskhiveResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TaskhiveResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = TaskhiveResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = TaskhiveResult<Role>> + Send;
    fn list(&self) -> impl Future<Output = TaskhiveResult<Vec<Role>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories (ambient scoping)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = TaskhiveResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TaskhiveResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = TaskhiveResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = TaskhiveResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = TaskhiveResult<PaginatedResult<User>>> + Send;
}

pub trait TeamRepository: Send + Sync {
    fn create(&self, input: CreateTeam) -> impl Future<Output = TaskhiveResult<Team>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TaskhiveResult<Team>> + Send;
    fn add_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamMemberRole,
    ) -> impl Future<Output = TaskhiveResult<Team>> + Send;
    fn remove_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TaskhiveResult<Team>> + Send;
    /// True iff the user appears in the team's member list.
    fn is_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TaskhiveResult<bool>> + Send;
}

pub trait SettingRepository: Send + Sync {
    fn set(&self, input: UpsertSetting) -> impl Future<Output = TaskhiveResult<Setting>> + Send;
    /// Point lookup; organization-scope value shadows a global one for
    /// the same key when an ambient tenant is present.
    fn get(&self, key: &str) -> impl Future<Output = TaskhiveResult<Option<Setting>>> + Send;
    /// Bulk read of the entire key space (trusted cache-reload path,
    /// crosses both scopes).
    fn load_all(&self) -> impl Future<Output = TaskhiveResult<Vec<Setting>>> + Send;
    /// Listing for administrative read endpoints. Secret-flagged
    /// settings are always excluded.
    fn list_by_category(
        &self,
        category: SettingCategory,
    ) -> impl Future<Output = TaskhiveResult<Vec<Setting>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit sink (write-only side channel)
// ---------------------------------------------------------------------------

/// Fire-and-forget audit recording. Implementations log their own
/// failures and never propagate them back to the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: CreateAuditEvent) -> impl Future<Output = ()> + Send;
}
