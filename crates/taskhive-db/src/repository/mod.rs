//! SurrealDB repository implementations.
//!
//! Globally-shared entities (organization, permission, role) are
//! implemented directly against the database handle. Tenant-scoped
//! entities (user, team, setting, activity log) route every operation
//! through [`crate::scope::ScopedStore`], which injects the ambient
//! tenant filter and fails closed when no context is established.

mod audit;
mod organization;
mod permission;
mod role;
mod setting;
mod team;
mod user;

pub use audit::SurrealAuditSink;
pub use organization::SurrealOrganizationRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use setting::SurrealSettingRepository;
pub use team::SurrealTeamRepository;
pub use user::SurrealUserRepository;
