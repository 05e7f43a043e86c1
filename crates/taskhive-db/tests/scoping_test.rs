//! Integration tests for the tenant scoping layer using in-memory
//! SurrealDB: automatic filter injection, fail-closed behavior, the
//! explicit bypass, and isolation between concurrent contexts.

use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;
use taskhive_core::context::with_tenant;
use taskhive_core::error::TaskhiveError;
use taskhive_core::models::audit::CreateAuditEvent;
use taskhive_core::models::setting::{SettingCategory, SettingScope, UpsertSetting};
use taskhive_core::models::user::CreateUser;
use taskhive_core::repository::{
    AuditSink, Pagination, SettingRepository, UserRepository,
};
use taskhive_db::{
    Filter, ScopeRegistry, ScopedStore, SurrealAuditSink, SurrealSettingRepository,
    SurrealUserRepository,
};
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    taskhive_db::run_migrations(&db).await.unwrap();
    db
}

fn store(db: &Surreal<Db>) -> ScopedStore<Db> {
    ScopedStore::new(db.clone(), ScopeRegistry::with_defaults())
}

fn new_user(name: &str, email: &str) -> CreateUser {
    CreateUser {
        organization_id: None,
        name: name.into(),
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        role_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn create_stamps_ambient_organization() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(store(&db));
    let org = Uuid::new_v4();

    let user = with_tenant(org, async {
        repo.create(new_user("Ada", "ada@example.com")).await
    })
    .await
    .unwrap();

    assert_eq!(user.organization_id, org);
}

#[tokio::test]
async fn records_invisible_across_organizations() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(store(&db));
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    with_tenant(org_a, async {
        repo.create(new_user("Ada", "ada@example.com")).await
    })
    .await
    .unwrap();

    // Same handle, other tenant context: nothing to see.
    let from_b = with_tenant(org_b, async {
        repo.get_by_email("ada@example.com").await
    })
    .await;
    assert!(matches!(from_b, Err(TaskhiveError::NotFound { .. })));

    let listed_b = with_tenant(org_b, async {
        repo.list(Pagination::default()).await
    })
    .await
    .unwrap();
    assert_eq!(listed_b.total, 0);

    let listed_a = with_tenant(org_a, async {
        repo.list(Pagination::default()).await
    })
    .await
    .unwrap();
    assert_eq!(listed_a.total, 1);
}

#[tokio::test]
async fn scoped_operation_without_context_fails_closed() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(store(&db));

    let result = repo.list(Pagination::default()).await;
    match result {
        Err(TaskhiveError::ScopingViolation { collection }) => {
            assert_eq!(collection, "user");
        }
        other => panic!("expected ScopingViolation, got {other:?}"),
    }

    let result = repo.create(new_user("Nobody", "nobody@example.com")).await;
    assert!(matches!(
        result,
        Err(TaskhiveError::ScopingViolation { .. })
    ));
}

#[tokio::test]
async fn unregistered_collection_rejected() {
    let db = setup().await;
    let store = store(&db);

    match store.collection("invoice") {
        Err(taskhive_db::DbError::UnknownCollection { collection }) => {
            assert_eq!(collection, "invoice");
        }
        Err(other) => panic!("expected UnknownCollection, got {other:?}"),
        Ok(_) => panic!("unregistered collection was accepted"),
    }
}

#[tokio::test]
async fn bypass_sees_all_tenants() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(store(&db));
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    with_tenant(org_a, async {
        repo.create(new_user("Ada", "ada@example.com")).await
    })
    .await
    .unwrap();
    with_tenant(org_b, async {
        repo.create(new_user("Grace", "grace@example.com")).await
    })
    .await
    .unwrap();

    // Administrative count across all tenants, no context needed.
    let collection = store(&db).collection("user").unwrap();
    let total = collection
        .count(Filter::new().bypass_tenant())
        .await
        .unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn concurrent_contexts_stay_isolated() {
    let db = setup().await;
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    let db_a = db.clone();
    let task_a = tokio::spawn(async move {
        let repo = SurrealUserRepository::new(ScopedStore::new(
            db_a,
            ScopeRegistry::with_defaults(),
        ));
        with_tenant(org_a, async {
            for i in 0..5 {
                repo.create(new_user(&format!("A{i}"), &format!("a{i}@example.com")))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
            repo.list(Pagination::default()).await.unwrap().total
        })
        .await
    });

    let db_b = db.clone();
    let task_b = tokio::spawn(async move {
        let repo = SurrealUserRepository::new(ScopedStore::new(
            db_b,
            ScopeRegistry::with_defaults(),
        ));
        with_tenant(org_b, async {
            for i in 0..3 {
                repo.create(new_user(&format!("B{i}"), &format!("b{i}@example.com")))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
            repo.list(Pagination::default()).await.unwrap().total
        })
        .await
    });

    let (seen_a, seen_b) = (task_a.await.unwrap(), task_b.await.unwrap());
    assert_eq!(seen_a, 5);
    assert_eq!(seen_b, 3);
}

#[tokio::test]
async fn audit_events_scoped_to_ambient_organization() {
    let db = setup().await;
    let sink = SurrealAuditSink::new(store(&db));
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    with_tenant(org_a, async {
        sink.record(CreateAuditEvent {
            organization_id: None,
            user_id: Uuid::new_v4(),
            action: "permission.denied".into(),
            entity_type: "authorization".into(),
            entity_id: None,
            details: json!({ "required": ["task:delete"] }),
        })
        .await;
    })
    .await;

    let collection = store(&db).collection("activity_log").unwrap();
    let in_a = with_tenant(org_a, async { collection.count(Filter::new()).await })
        .await
        .unwrap();
    assert_eq!(in_a, 1);

    let collection = store(&db).collection("activity_log").unwrap();
    let in_b = with_tenant(org_b, async { collection.count(Filter::new()).await })
        .await
        .unwrap();
    assert_eq!(in_b, 0);
}

#[tokio::test]
async fn organization_setting_shadows_global() {
    let db = setup().await;
    let repo = SurrealSettingRepository::new(store(&db));
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    repo.set(UpsertSetting {
        key: "maintenance_mode".into(),
        value: json!(false),
        description: "Global default".into(),
        category: SettingCategory::Maintenance,
        is_secret: false,
        scope: SettingScope::Global,
        organization_id: None,
    })
    .await
    .unwrap();

    with_tenant(org_a, async {
        repo.set(UpsertSetting {
            key: "maintenance_mode".into(),
            value: json!(true),
            description: "Org override".into(),
            category: SettingCategory::Maintenance,
            is_secret: false,
            scope: SettingScope::Organization,
            organization_id: None,
        })
        .await
    })
    .await
    .unwrap();

    // The overriding tenant sees its own value.
    let in_a = with_tenant(org_a, async { repo.get("maintenance_mode").await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(in_a.value, json!(true));

    // Everyone else still sees the global one.
    let in_b = with_tenant(org_b, async { repo.get("maintenance_mode").await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(in_b.value, json!(false));
    assert!(in_b.organization_id.is_none());
}

#[tokio::test]
async fn aggregate_confined_to_ambient_organization() {
    #[derive(Debug, SurrealValue)]
    struct TotalRow {
        total: u64,
    }

    let db = setup().await;
    let repo = SurrealUserRepository::new(store(&db));
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    with_tenant(org_a, async {
        for i in 0..3 {
            repo.create(new_user(&format!("A{i}"), &format!("a{i}@example.com")))
                .await
                .unwrap();
        }
    })
    .await;
    with_tenant(org_b, async {
        repo.create(new_user("B0", "b0@example.com")).await.unwrap();
    })
    .await;

    // The tenant match lands ahead of the grouping stage.
    let collection = store(&db).collection("user").unwrap();
    let rows: Vec<TotalRow> = with_tenant(org_a, async {
        collection
            .aggregate("count() AS total", Filter::new(), None)
            .await
    })
    .await
    .unwrap();
    assert_eq!(rows.first().map(|r| r.total), Some(3));
}
