//! Integration tests for the RBAC engine against in-memory SurrealDB
//! with the real repositories and audit sink.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use taskhive_authz::{
    bootstrap_catalog, CheckMode, CheckOptions, PermissionResolver, RecordedOwner,
};
use taskhive_core::context::with_tenant;
use taskhive_core::models::role::{CreateRole, UpdateRole};
use taskhive_core::models::team::CreateTeam;
use taskhive_core::models::user::CreateUser;
use taskhive_core::repository::{RoleRepository, TeamRepository, UserRepository};
use taskhive_db::{
    Filter, ScopeRegistry, ScopedStore, SurrealAuditSink, SurrealPermissionRepository,
    SurrealRoleRepository, SurrealTeamRepository, SurrealUserRepository,
};
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type Resolver = PermissionResolver<
    SurrealUserRepository<Db>,
    SurrealRoleRepository<Db>,
    SurrealTeamRepository<Db>,
    SurrealAuditSink<Db>,
>;

/// Helper: in-memory DB with migrations and the bootstrapped catalog.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    taskhive_db::run_migrations(&db).await.unwrap();

    let permissions = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    bootstrap_catalog(&permissions, &roles).await.unwrap();

    db
}

fn store(db: &Surreal<Db>) -> ScopedStore<Db> {
    ScopedStore::new(db.clone(), ScopeRegistry::with_defaults())
}

fn resolver(db: &Surreal<Db>) -> Resolver {
    let store = store(db);
    PermissionResolver::new(
        SurrealUserRepository::new(store.clone()),
        SurrealRoleRepository::new(db.clone()),
        SurrealTeamRepository::new(store.clone()),
        SurrealAuditSink::new(store),
    )
}

/// Helper: create a user with the named system role inside the
/// current tenant context.
async fn user_with_role(db: &Surreal<Db>, role_name: &str, email: &str) -> Uuid {
    let roles = SurrealRoleRepository::new(db.clone());
    let role = roles.get_by_name(role_name).await.unwrap();
    let users = SurrealUserRepository::new(store(db));
    users
        .create(CreateUser {
            organization_id: None,
            name: role_name.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            role_id: role.id,
        })
        .await
        .unwrap()
        .id
}

async fn denial_count(db: &Surreal<Db>) -> u64 {
    store(db)
        .collection("activity_log")
        .unwrap()
        .count(Filter::new().eq("action", "permission.denied"))
        .await
        .unwrap()
}

#[tokio::test]
async fn member_denied_task_delete_and_audited() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let actor = user_with_role(&db, "member", "member@example.com").await;

        let effective = resolver.effective_permissions(actor).await.unwrap();
        assert!(effective.contains("task:read"));
        assert!(effective.contains("task:create"));
        assert!(!effective.contains("task:delete"));

        let allowed = resolver
            .check(
                actor,
                &["task:delete"],
                CheckMode::All,
                &CheckOptions::operation("tasks.delete"),
            )
            .await
            .unwrap();
        assert!(!allowed);

        // The denial landed in the audit log with the required
        // permission attached.
        assert_eq!(denial_count(&db).await, 1);
    })
    .await;
}

#[tokio::test]
async fn system_manage_short_circuits_every_check() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        // A role holding only the global-admin permission, nothing
        // task- or team-specific.
        let roles = SurrealRoleRepository::new(db.clone());
        roles
            .upsert(CreateRole {
                name: "root".into(),
                description: "Global admin".into(),
                permissions: vec!["system:manage".into()],
                is_system: true,
                organization_id: None,
            })
            .await
            .unwrap();
        let actor = user_with_role(&db, "root", "root@example.com").await;

        assert!(
            resolver
                .check(actor, &["team:delete"], CheckMode::All, &CheckOptions::default())
                .await
                .unwrap()
        );
        assert!(
            resolver
                .check(
                    actor,
                    &["task:delete", "user:delete", "made:up"],
                    CheckMode::All,
                    &CheckOptions::default(),
                )
                .await
                .unwrap()
        );
        assert_eq!(denial_count(&db).await, 0);
    })
    .await;
}

#[tokio::test]
async fn any_mode_accepts_partial_grants() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let actor = user_with_role(&db, "member", "member@example.com").await;

        assert!(
            resolver
                .check(
                    actor,
                    &["task:delete", "task:read"],
                    CheckMode::Any,
                    &CheckOptions::default(),
                )
                .await
                .unwrap()
        );
        assert!(
            !resolver
                .check(
                    actor,
                    &["task:delete", "task:read"],
                    CheckMode::All,
                    &CheckOptions::default(),
                )
                .await
                .unwrap()
        );
    })
    .await;
}

#[tokio::test]
async fn unknown_actor_resolves_to_empty_set_and_denies() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let ghost = Uuid::new_v4();
        assert!(resolver.effective_permissions(ghost).await.unwrap().is_empty());
        assert!(
            !resolver
                .check(ghost, &["task:read"], CheckMode::All, &CheckOptions::default())
                .await
                .unwrap()
        );
    })
    .await;
}

#[tokio::test]
async fn role_edits_take_effect_on_next_resolution() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let roles = SurrealRoleRepository::new(db.clone());
        let role = roles
            .upsert(CreateRole {
                name: "auditor".into(),
                description: "Read-only".into(),
                permissions: vec!["activity_log:read".into()],
                is_system: true,
                organization_id: None,
            })
            .await
            .unwrap();
        let actor = user_with_role(&db, "auditor", "auditor@example.com").await;

        assert!(
            !resolver
                .check(actor, &["task:read"], CheckMode::All, &CheckOptions::default())
                .await
                .unwrap()
        );

        roles
            .update(
                role.id,
                UpdateRole {
                    permissions: Some(vec!["activity_log:read".into(), "task:read".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // No caching between resolutions: the grant is visible now.
        assert!(
            resolver
                .check(actor, &["task:read"], CheckMode::All, &CheckOptions::default())
                .await
                .unwrap()
        );
    })
    .await;
}

#[tokio::test]
async fn ownership_grants_regardless_of_role() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let owner = user_with_role(&db, "member", "owner@example.com").await;
        let stranger = user_with_role(&db, "member", "stranger@example.com").await;

        let recorded = RecordedOwner(Some(owner));
        assert!(
            resolver
                .check_ownership(owner, &recorded, "task:manage", &CheckOptions::default())
                .await
                .unwrap()
        );
        // Member lacks the fallback permission.
        assert!(
            !resolver
                .check_ownership(stranger, &recorded, "user:manage", &CheckOptions::default())
                .await
                .unwrap()
        );
        // A manager holds task:manage, so the fallback path grants.
        let manager = user_with_role(&db, "manager", "manager@example.com").await;
        assert!(
            resolver
                .check_ownership(manager, &recorded, "task:manage", &CheckOptions::default())
                .await
                .unwrap()
        );
    })
    .await;
}

#[tokio::test]
async fn creator_only_grants_to_manage_family() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let creator = user_with_role(&db, "member", "creator@example.com").await;
        let manager = user_with_role(&db, "manager", "manager@example.com").await;

        let recorded = RecordedOwner(Some(creator));

        // The creator passes without any manage permission.
        assert!(
            resolver
                .check_creator_only(creator, &recorded, "task", &CheckOptions::default())
                .await
                .unwrap()
        );
        // Not the creator, but holds task:manage.
        assert!(
            resolver
                .check_creator_only(manager, &recorded, "task", &CheckOptions::default())
                .await
                .unwrap()
        );
        // Not the creator and no team:manage on the member role.
        let other = user_with_role(&db, "member", "other@example.com").await;
        assert!(
            !resolver
                .check_creator_only(other, &recorded, "team", &CheckOptions::default())
                .await
                .unwrap()
        );
    })
    .await;
}

#[tokio::test]
async fn team_membership_check() {
    let db = setup().await;
    let resolver = resolver(&db);
    let org = Uuid::new_v4();

    with_tenant(org, async {
        let owner = user_with_role(&db, "member", "owner@example.com").await;
        let outsider = user_with_role(&db, "member", "outsider@example.com").await;

        let teams = SurrealTeamRepository::new(store(&db));
        let team = teams
            .create(CreateTeam {
                organization_id: None,
                name: "Platform".into(),
                description: String::new(),
                owner_id: owner,
            })
            .await
            .unwrap();

        assert!(
            resolver
                .check_team_membership(owner, team.id, &CheckOptions::default())
                .await
                .unwrap()
        );
        assert!(
            !resolver
                .check_team_membership(outsider, team.id, &CheckOptions::default())
                .await
                .unwrap()
        );
        // A missing team is a deny, not an error.
        assert!(
            !resolver
                .check_team_membership(owner, Uuid::new_v4(), &CheckOptions::default())
                .await
                .unwrap()
        );
    })
    .await;
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let db = setup().await;

    // Second run: same catalog, same roles, no duplicates.
    let permissions = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    bootstrap_catalog(&permissions, &roles).await.unwrap();

    use taskhive_core::repository::PermissionRepository;
    let all = permissions.list_all().await.unwrap();
    assert_eq!(all.len(), taskhive_authz::DEFAULT_PERMISSIONS.len());

    let admin = roles.get_by_name("admin").await.unwrap();
    assert_eq!(admin.permissions.len(), all.len());
    let manager = roles.get_by_name("manager").await.unwrap();
    assert!(!manager.permissions.contains(&"team:delete".to_string()));
}

#[tokio::test]
async fn resolution_without_context_is_an_error_not_a_deny() {
    let db = setup().await;
    let resolver = resolver(&db);

    // The actor store is tenant-scoped; with no ambient tenant the
    // lookup fails closed and surfaces as a lookup error.
    let result = resolver
        .check(Uuid::new_v4(), &["task:read"], CheckMode::All, &CheckOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(taskhive_core::error::TaskhiveError::Lookup { .. })
    ));
}
