//! TaskHive Authz — RBAC permission resolution, escalation rules
//! (ownership, creatorship, team membership), and the permission
//! catalog bootstrap.

pub mod catalog;
pub mod error;
pub mod escalation;
pub mod resolver;

pub use catalog::{bootstrap_catalog, DEFAULT_PERMISSIONS};
pub use error::AuthzError;
pub use escalation::{OwnerResolver, RecordedOwner};
pub use resolver::{CheckMode, CheckOptions, PermissionResolver};
