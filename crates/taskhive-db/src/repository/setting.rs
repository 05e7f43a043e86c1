//! SurrealDB implementation of [`SettingRepository`].
//!
//! Settings are the one collection read across both scopes at once:
//! a key lookup must see global rows as well as the ambient tenant's,
//! with the tenant's value shadowing the global one. Reads therefore
//! use the explicit bypass and narrow to the ambient tenant in
//! memory; the bulk load feeding the settings cache is a trusted
//! cross-scope path by design of the cache.

use chrono::{DateTime, Utc};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use taskhive_core::context::current_tenant;
use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::setting::{
    Setting, SettingCategory, SettingScope, UpsertSetting,
};
use taskhive_core::repository::SettingRepository;
use uuid::Uuid;

use crate::error::DbError;
use crate::scope::{Document, Filter, ScopedStore, ORGANIZATION_ID_FIELD};

const COLLECTION: &str = "setting";

#[derive(Debug, SurrealValue)]
struct SettingRow {
    key: String,
    value: serde_json::Value,
    description: String,
    category: String,
    is_secret: bool,
    scope: String,
    organization_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SettingRow {
    fn into_setting(self, id: Uuid) -> Result<Setting, DbError> {
        let category = SettingCategory::parse(&self.category)
            .ok_or_else(|| DbError::Query(format!("invalid setting category: {}", self.category)))?;
        let scope = SettingScope::parse(&self.scope)
            .ok_or_else(|| DbError::Query(format!("invalid setting scope: {}", self.scope)))?;
        let organization_id = self
            .organization_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Query(format!("invalid organization UUID: {e}")))
            })
            .transpose()?;
        Ok(Setting {
            id,
            key: self.key,
            value: self.value,
            description: self.description,
            category,
            is_secret: self.is_secret,
            scope,
            organization_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SettingRowWithId {
    record_id: String,
    key: String,
    value: serde_json::Value,
    description: String,
    category: String,
    is_secret: bool,
    scope: String,
    organization_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SettingRowWithId {
    fn try_into_setting(self) -> Result<Setting, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        SettingRow {
            key: self.key,
            value: self.value,
            description: self.description,
            category: self.category,
            is_secret: self.is_secret,
            scope: self.scope,
            organization_id: self.organization_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_setting(id)
    }

    /// Whether this row is visible from the given tenant's viewpoint:
    /// global rows always are, organization rows only to their owner.
    fn visible_to(&self, ambient: Option<Uuid>) -> bool {
        match (&self.organization_id, ambient) {
            (None, _) => true,
            (Some(owner), Some(org)) => owner == &org.to_string(),
            (Some(_), None) => false,
        }
    }
}

/// SurrealDB implementation of the Setting repository.
#[derive(Clone)]
pub struct SurrealSettingRepository<C: Connection> {
    store: ScopedStore<C>,
}

impl<C: Connection> SurrealSettingRepository<C> {
    pub fn new(store: ScopedStore<C>) -> Self {
        Self { store }
    }
}

impl<C: Connection> SettingRepository for SurrealSettingRepository<C> {
    async fn set(&self, input: UpsertSetting) -> TaskhiveResult<Setting> {
        let collection = self.store.collection(COLLECTION)?;

        // Locate the existing row within the key's uniqueness group.
        let filter = match input.scope {
            SettingScope::Global => Filter::new()
                .eq("key", input.key.clone())
                .eq("scope", SettingScope::Global.as_str())
                .bypass_tenant(),
            SettingScope::Organization => {
                let base = Filter::new()
                    .eq("key", input.key.clone())
                    .eq("scope", SettingScope::Organization.as_str());
                match input.organization_id {
                    Some(org) => base.eq(ORGANIZATION_ID_FIELD, org.to_string()),
                    None => base,
                }
            }
        };
        let existing: Option<SettingRowWithId> = collection.find_one(filter).await?;

        if let Some(row) = existing {
            let id = Uuid::parse_str(&row.record_id)
                .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
            let doc = Document::new()
                .set("value", input.value)
                .set("description", input.description)
                .set("category", input.category.as_str())
                .set("is_secret", input.is_secret);
            // Writes return the bare record, without the projected
            // record_id reads carry; the id is already known here.
            let updated: Option<SettingRow> = collection
                .update_by_id(id, Filter::new().bypass_tenant(), doc)
                .await?;
            let updated = updated.ok_or(DbError::NotFound {
                entity: COLLECTION.into(),
                id: id.to_string(),
            })?;
            return Ok(updated.into_setting(id)?);
        }

        let id = Uuid::new_v4();
        let mut doc = Document::new()
            .set("key", input.key)
            .set("value", input.value)
            .set("description", input.description)
            .set("category", input.category.as_str())
            .set("is_secret", input.is_secret)
            .set("scope", input.scope.as_str());
        match input.scope {
            // Global rows carry no owner; skip stamping outright.
            SettingScope::Global => doc = doc.bypass_tenant(),
            SettingScope::Organization => {
                if let Some(org) = input.organization_id {
                    doc = doc.set(ORGANIZATION_ID_FIELD, org.to_string());
                }
            }
        }

        let row: SettingRow = collection.create(id, doc).await?;
        Ok(row.into_setting(id)?)
    }

    async fn get(&self, key: &str) -> TaskhiveResult<Option<Setting>> {
        let rows: Vec<SettingRowWithId> = self
            .store
            .collection(COLLECTION)?
            .find(Filter::new().eq("key", key).bypass_tenant())
            .await?;

        // The tenant's own value shadows the global one.
        let ambient = current_tenant();
        let mut global = None;
        for row in rows.into_iter().filter(|r| r.visible_to(ambient)) {
            if row.organization_id.is_some() {
                return Ok(Some(row.try_into_setting()?));
            }
            global = Some(row);
        }
        match global {
            Some(row) => Ok(Some(row.try_into_setting()?)),
            None => Ok(None),
        }
    }

    async fn load_all(&self) -> TaskhiveResult<Vec<Setting>> {
        let rows: Vec<SettingRowWithId> = self
            .store
            .collection(COLLECTION)?
            .find(Filter::new().bypass_tenant())
            .await?;

        let settings = rows
            .into_iter()
            .map(|row| row.try_into_setting())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(settings)
    }

    async fn list_by_category(&self, category: SettingCategory) -> TaskhiveResult<Vec<Setting>> {
        let rows: Vec<SettingRowWithId> = self
            .store
            .collection(COLLECTION)?
            .find(Filter::new().eq("category", category.as_str()).bypass_tenant())
            .await?;

        let ambient = current_tenant();
        let settings = rows
            .into_iter()
            .filter(|r| r.visible_to(ambient) && !r.is_secret)
            .map(|row| row.try_into_setting())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(settings)
    }
}
