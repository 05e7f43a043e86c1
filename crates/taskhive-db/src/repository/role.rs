//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::role::{CreateRole, Role, UpdateRole};
use taskhive_core::repository::RoleRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
    description: String,
    permissions: Vec<String>,
    is_system: bool,
    organization_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Result<Role, DbError> {
        let organization_id = self
            .organization_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Query(format!("invalid organization UUID: {e}")))
            })
            .transpose()?;
        Ok(Role {
            id,
            name: self.name,
            description: self.description,
            permissions: self.permissions,
            is_system: self.is_system,
            organization_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
    description: String,
    permissions: Vec<String>,
    is_system: bool,
    organization_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let organization_id = self
            .organization_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Query(format!("invalid organization UUID: {e}")))
            })
            .transpose()?;
        Ok(Role {
            id,
            name: self.name,
            description: self.description,
            permissions: self.permissions,
            is_system: self.is_system,
            organization_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Finds a role by name within its uniqueness group: system roles
    /// have no owner, custom roles are keyed per organization.
    async fn find_in_group(
        &self,
        name: &str,
        organization_id: Option<Uuid>,
    ) -> Result<Option<Role>, DbError> {
        let query = if organization_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE name = $name AND organization_id = $organization_id LIMIT 1"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE name = $name AND organization_id = NONE LIMIT 1"
        };

        let mut result = self
            .db
            .query(query)
            .bind(("name", name.to_string()))
            .bind(("organization_id", organization_id.map(|o| o.to_string())))
            .await?;

        let rows: Vec<RoleRowWithId> = result.take(0)?;
        rows.into_iter().next().map(|r| r.try_into_role()).transpose()
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn upsert(&self, input: CreateRole) -> TaskhiveResult<Role> {
        if let Some(existing) = self.find_in_group(&input.name, input.organization_id).await? {
            let result = self
                .db
                .query(
                    "UPDATE type::record('role', $id) SET \
                     description = $description, permissions = $permissions, \
                     updated_at = time::now()",
                )
                .bind(("id", existing.id.to_string()))
                .bind(("description", input.description))
                .bind(("permissions", input.permissions))
                .await
                .map_err(DbError::from)?;
            result.check().map_err(|e| DbError::Query(e.to_string()))?;

            return self.get_by_id(existing.id).await;
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description, \
                 permissions = $permissions, is_system = $is_system, \
                 organization_id = $organization_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("permissions", input.permissions))
            .bind(("is_system", input.is_system))
            .bind(("organization_id", input.organization_id.map(|o| o.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> TaskhiveResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn get_by_name(&self, name: &str) -> TaskhiveResult<Role> {
        // System roles take precedence over same-named custom roles.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE name = $name ORDER BY is_system DESC LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: name.to_string(),
        })?;

        Ok(row.try_into_role()?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> TaskhiveResult<Role> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.permissions.is_some() {
            sets.push("permissions = $permissions");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('role', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(permissions) = input.permissions {
            builder = builder.bind(("permissions", permissions));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn list(&self) -> TaskhiveResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 ORDER BY name ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let roles = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(roles)
    }
}
