//! SurrealDB implementation of [`PermissionRepository`].
//!
//! The permission catalog is append-only in practice: entries are
//! written by the bootstrap upsert and never removed.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::permission::{CreatePermission, Permission};
use taskhive_core::repository::PermissionRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    name: String,
    resource: String,
    action: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    name: String,
    resource: String,
    action: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        Ok(Permission {
            id,
            name: self.name,
            resource: self.resource,
            action: self.action,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Permission>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE name = $name LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .await?;

        let rows: Vec<PermissionRowWithId> = result.take(0)?;
        rows.into_iter().next().map(|r| r.try_into_permission()).transpose()
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn upsert(&self, input: CreatePermission) -> TaskhiveResult<Permission> {
        // Catalog entries are keyed by name; a second bootstrap run
        // refreshes the description instead of duplicating the entry.
        if let Some(existing) = self.find_by_name(&input.name).await? {
            let result = self
                .db
                .query(
                    "UPDATE type::record('permission', $id) SET \
                     resource = $resource, action = $action, \
                     description = $description, updated_at = time::now()",
                )
                .bind(("id", existing.id.to_string()))
                .bind(("resource", input.resource))
                .bind(("action", input.action))
                .bind(("description", input.description))
                .await
                .map_err(DbError::from)?;
            result.check().map_err(|e| DbError::Query(e.to_string()))?;

            return self.get_by_name(&existing.name).await;
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, resource = $resource, action = $action, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("resource", input.resource))
            .bind(("action", input.action))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(Permission {
            id,
            name: row.name,
            resource: row.resource,
            action: row.action,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_name(&self, name: &str) -> TaskhiveResult<Permission> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| {
                DbError::NotFound {
                    entity: "permission".into(),
                    id: name.to_string(),
                }
                .into()
            })
    }

    async fn list_all(&self) -> TaskhiveResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY name ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        let permissions = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(permissions)
    }
}
