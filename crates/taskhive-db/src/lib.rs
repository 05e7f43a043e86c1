//! TaskHive Database — SurrealDB connection management, tenant-scoped
//! data access, and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The tenant scoping layer ([`ScopedStore`], [`ScopeRegistry`])
//! - Implementations of the `taskhive-core` repository traits
//! - Error types ([`DbError`])

mod connection;
mod error;
mod repository;
mod schema;
pub mod scope;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealAuditSink, SurrealOrganizationRepository, SurrealPermissionRepository,
    SurrealRoleRepository, SurrealSettingRepository, SurrealTeamRepository,
    SurrealUserRepository,
};
pub use schema::{run_migrations, schema_v1};
pub use scope::{Document, Filter, ScopeKind, ScopeRegistry, ScopedCollection, ScopedStore};
