//! SurrealDB implementation of [`UserRepository`].
//!
//! All operations run through the scoped store, so every query is
//! confined to the ambient tenant without the repository naming it.

use chrono::{DateTime, Utc};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::user::{CreateUser, UpdateUser, User};
use taskhive_core::repository::{PaginatedResult, Pagination, UserRepository};
use uuid::Uuid;

use crate::error::DbError;
use crate::scope::{Document, Filter, ScopedStore, ORGANIZATION_ID_FIELD};

const COLLECTION: &str = "user";

#[derive(Debug, SurrealValue)]
struct UserRow {
    organization_id: String,
    name: String,
    email: String,
    password_hash: String,
    role_id: String,
    team_ids: Vec<String>,
    avatar_url: String,
    failed_login_attempts: u32,
    lockout_until: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Query(format!("invalid organization UUID: {e}")))?;
        let role_id = Uuid::parse_str(&self.role_id)
            .map_err(|e| DbError::Query(format!("invalid role UUID: {e}")))?;
        let team_ids = self
            .team_ids
            .iter()
            .map(|s| Uuid::parse_str(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::Query(format!("invalid team UUID: {e}")))?;
        let lockout_until = self
            .lockout_until
            .as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| DbError::Query(format!("invalid lockout timestamp: {e}")))
            })
            .transpose()?;
        Ok(User {
            id,
            organization_id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role_id,
            team_ids,
            avatar_url: self.avatar_url,
            failed_login_attempts: self.failed_login_attempts,
            lockout_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    email: String,
    password_hash: String,
    role_id: String,
    team_ids: Vec<String>,
    avatar_url: String,
    failed_login_attempts: u32,
    lockout_until: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        UserRow {
            organization_id: self.organization_id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role_id: self.role_id,
            team_ids: self.team_ids,
            avatar_url: self.avatar_url,
            failed_login_attempts: self.failed_login_attempts,
            lockout_until: self.lockout_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id)
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    store: ScopedStore<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(store: ScopedStore<C>) -> Self {
        Self { store }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> TaskhiveResult<User> {
        let id = Uuid::new_v4();

        let mut doc = Document::new()
            .set("name", input.name)
            .set("email", input.email)
            .set("password_hash", input.password_hash)
            .set("role_id", input.role_id.to_string())
            .set("team_ids", serde_json::Value::Array(Vec::new()));
        // An explicit organization wins; otherwise the store stamps
        // the ambient tenant.
        if let Some(org) = input.organization_id {
            doc = doc.set(ORGANIZATION_ID_FIELD, org.to_string());
        }

        let row: UserRow = self.store.collection(COLLECTION)?.create(id, doc).await?;
        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> TaskhiveResult<User> {
        let row: Option<UserRow> = self
            .store
            .collection(COLLECTION)?
            .get(id, Filter::new())
            .await?;
        let row = row.ok_or(DbError::NotFound {
            entity: COLLECTION.into(),
            id: id.to_string(),
        })?;
        Ok(row.into_user(id)?)
    }

    async fn get_by_email(&self, email: &str) -> TaskhiveResult<User> {
        let row: Option<UserRowWithId> = self
            .store
            .collection(COLLECTION)?
            .find_one(Filter::new().eq("email", email))
            .await?;
        let row = row.ok_or_else(|| DbError::NotFound {
            entity: COLLECTION.into(),
            id: email.to_string(),
        })?;
        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> TaskhiveResult<User> {
        let mut doc = Document::new();
        if let Some(name) = input.name {
            doc = doc.set("name", name);
        }
        if let Some(email) = input.email {
            doc = doc.set("email", email);
        }
        if let Some(role_id) = input.role_id {
            doc = doc.set("role_id", role_id.to_string());
        }
        if let Some(team_ids) = input.team_ids {
            let ids: Vec<serde_json::Value> = team_ids
                .iter()
                .map(|t| serde_json::Value::String(t.to_string()))
                .collect();
            doc = doc.set("team_ids", serde_json::Value::Array(ids));
        }
        if let Some(avatar_url) = input.avatar_url {
            doc = doc.set("avatar_url", avatar_url);
        }
        if let Some(attempts) = input.failed_login_attempts {
            doc = doc.set("failed_login_attempts", attempts);
        }
        match input.lockout_until {
            Some(Some(until)) => doc = doc.set("lockout_until", until.to_rfc3339()),
            Some(None) => doc = doc.unset("lockout_until"),
            None => {}
        }

        let row: Option<UserRow> = self
            .store
            .collection(COLLECTION)?
            .update_by_id(id, Filter::new(), doc)
            .await?;
        let row = row.ok_or(DbError::NotFound {
            entity: COLLECTION.into(),
            id: id.to_string(),
        })?;
        Ok(row.into_user(id)?)
    }

    async fn list(&self, pagination: Pagination) -> TaskhiveResult<PaginatedResult<User>> {
        let collection = self.store.collection(COLLECTION)?;

        let total = collection.count(Filter::new()).await?;
        let rows: Vec<UserRowWithId> = collection
            .find_page(Filter::new(), "created_at", pagination.limit, pagination.offset)
            .await?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
