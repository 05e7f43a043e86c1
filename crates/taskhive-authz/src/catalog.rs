//! Permission catalog and system-role bootstrap.
//!
//! Run once at startup. Every write is an upsert keyed by name, so
//! re-running against an already-initialized store refreshes
//! descriptions and role permission sets without duplicating entries.

use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::permission::{CreatePermission, SYSTEM_MANAGE};
use taskhive_core::models::role::CreateRole;
use taskhive_core::repository::{PermissionRepository, RoleRepository};
use tracing::info;

/// One catalog entry.
pub struct PermissionSpec {
    pub name: &'static str,
    pub resource: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

/// The full permission catalog.
pub const DEFAULT_PERMISSIONS: &[PermissionSpec] = &[
    PermissionSpec { name: "task:create", resource: "task", action: "create", description: "Create tasks" },
    PermissionSpec { name: "task:read", resource: "task", action: "read", description: "Read tasks" },
    PermissionSpec { name: "task:update", resource: "task", action: "update", description: "Update tasks" },
    PermissionSpec { name: "task:delete", resource: "task", action: "delete", description: "Delete tasks" },
    PermissionSpec { name: "task:manage", resource: "task", action: "manage", description: "Manage all tasks" },
    PermissionSpec { name: "team:create", resource: "team", action: "create", description: "Create teams" },
    PermissionSpec { name: "team:read", resource: "team", action: "read", description: "Read team info" },
    PermissionSpec { name: "team:update", resource: "team", action: "update", description: "Update team info" },
    PermissionSpec { name: "team:delete", resource: "team", action: "delete", description: "Delete teams" },
    PermissionSpec { name: "team:manage", resource: "team", action: "manage", description: "Manage all teams" },
    PermissionSpec { name: "team:manage_members", resource: "team", action: "manage_members", description: "Manage team members (invite, remove, change roles)" },
    PermissionSpec { name: "user:create", resource: "user", action: "create", description: "Create users" },
    PermissionSpec { name: "user:read", resource: "user", action: "read", description: "Read user info" },
    PermissionSpec { name: "user:update", resource: "user", action: "update", description: "Update user info" },
    PermissionSpec { name: "user:delete", resource: "user", action: "delete", description: "Delete users" },
    PermissionSpec { name: "user:manage", resource: "user", action: "manage", description: "Manage all users" },
    PermissionSpec { name: "activity_log:read", resource: "activity_log", action: "read", description: "Read activity logs" },
    PermissionSpec { name: "notification:read", resource: "notification", action: "read", description: "Read notifications" },
    PermissionSpec { name: SYSTEM_MANAGE, resource: "all", action: "manage", description: "Manage system settings" },
];

fn names_where(pred: impl Fn(&PermissionSpec) -> bool) -> Vec<String> {
    DEFAULT_PERMISSIONS
        .iter()
        .filter(|p| pred(p))
        .map(|p| p.name.to_string())
        .collect()
}

/// Permission set for the built-in `admin` role.
pub fn admin_permissions() -> Vec<String> {
    names_where(|_| true)
}

/// Permission set for the built-in `manager` role: full task access,
/// team management short of deletion, read-only user access.
pub fn manager_permissions() -> Vec<String> {
    names_where(|p| match p.resource {
        "task" => true,
        "team" => p.action != "delete",
        "user" => p.action == "read",
        "activity_log" | "notification" => true,
        _ => false,
    })
}

/// Permission set for the built-in `member` role: task access short
/// of deletion, read-only team and user access.
pub fn member_permissions() -> Vec<String> {
    names_where(|p| match p.resource {
        "task" => p.action != "delete",
        "team" => p.action == "read",
        "user" => p.action == "read",
        "activity_log" | "notification" => true,
        _ => false,
    })
}

/// Upserts the permission catalog and the three built-in system
/// roles. Idempotent.
pub async fn bootstrap_catalog<P, R>(permissions: &P, roles: &R) -> TaskhiveResult<()>
where
    P: PermissionRepository,
    R: RoleRepository,
{
    for spec in DEFAULT_PERMISSIONS {
        permissions
            .upsert(CreatePermission {
                name: spec.name.into(),
                resource: spec.resource.into(),
                action: spec.action.into(),
                description: spec.description.into(),
            })
            .await?;
    }

    let system_roles = [
        (
            "admin",
            "System administrator with full access",
            admin_permissions(),
        ),
        (
            "manager",
            "Team manager with team management permissions",
            manager_permissions(),
        ),
        ("member", "Regular team member", member_permissions()),
    ];

    for (name, description, permission_names) in system_roles {
        roles
            .upsert(CreateRole {
                name: name.into(),
                description: description.into(),
                permissions: permission_names,
                is_system: true,
                organization_id: None,
            })
            .await?;
    }

    info!(
        permissions = DEFAULT_PERMISSIONS.len(),
        roles = 3,
        "permission catalog bootstrapped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        let mut names: Vec<_> = DEFAULT_PERMISSIONS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_PERMISSIONS.len());
    }

    #[test]
    fn names_follow_resource_action_form() {
        for spec in DEFAULT_PERMISSIONS {
            if spec.name == SYSTEM_MANAGE {
                continue; // resource category is "all", name is "system:manage"
            }
            assert_eq!(spec.name, format!("{}:{}", spec.resource, spec.action));
        }
    }

    #[test]
    fn manager_cannot_delete_teams() {
        let perms = manager_permissions();
        assert!(perms.contains(&"team:manage".to_string()));
        assert!(!perms.contains(&"team:delete".to_string()));
        assert!(!perms.contains(&SYSTEM_MANAGE.to_string()));
    }

    #[test]
    fn member_cannot_delete_tasks() {
        let perms = member_permissions();
        assert!(perms.contains(&"task:read".to_string()));
        assert!(perms.contains(&"task:create".to_string()));
        assert!(!perms.contains(&"task:delete".to_string()));
        assert!(!perms.contains(&"team:update".to_string()));
    }

    #[test]
    fn admin_holds_everything() {
        assert_eq!(admin_permissions().len(), DEFAULT_PERMISSIONS.len());
        assert!(admin_permissions().contains(&SYSTEM_MANAGE.to_string()));
    }
}
