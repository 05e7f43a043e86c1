//! Tenant-scoped data access layer.
//!
//! Every read, write, count, delete, and aggregate against a
//! tenant-scoped collection goes through [`ScopedCollection`], which
//! resolves the operation's [`Filter`] before any I/O:
//!
//! - an explicit `organization_id` condition is left untouched;
//! - an explicit bypass marker leaves the operation unscoped (logged);
//! - global collections are never scoped;
//! - otherwise the ambient tenant from
//!   [`taskhive_core::context::current_tenant`] is injected, and if
//!   none is established the operation fails closed with
//!   [`DbError::ScopingViolation`].
//!
//! Repositories receive a [`ScopedStore`] instead of a raw database
//! handle, so scoping cannot be skipped by omission. The layer
//! performs no I/O of its own beyond the operation it wraps.

use std::collections::HashSet;
use std::sync::Arc;

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use taskhive_core::context::current_tenant;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbError;

/// The field stamped onto and filtered on every tenant-scoped record.
pub const ORGANIZATION_ID_FIELD: &str = "organization_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Auto-scoped to the ambient tenant.
    Scoped,
    /// Globally shared; never auto-scoped.
    Global,
}

/// Fixed allow-lists classifying every collection this core touches.
///
/// The two sets are disjoint; operations on collections in neither
/// set are rejected, so a new entity type must be classified before
/// it can be queried at all.
#[derive(Debug, Clone, Default)]
pub struct ScopeRegistry {
    scoped: HashSet<String>,
    global: HashSet<String>,
}

impl ScopeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard TaskHive classification.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for name in ["user", "task", "team", "activity_log", "notification", "setting"] {
            registry.register_scoped_type(name);
        }
        for name in ["organization", "permission", "role"] {
            registry.register_global_type(name);
        }
        registry
    }

    pub fn register_scoped_type(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug_assert!(!self.global.contains(&name), "collection registered as global");
        self.scoped.insert(name);
    }

    pub fn register_global_type(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug_assert!(!self.scoped.contains(&name), "collection registered as scoped");
        self.global.insert(name);
    }

    pub fn classify(&self, collection: &str) -> Option<ScopeKind> {
        if self.scoped.contains(collection) {
            Some(ScopeKind::Scoped)
        } else if self.global.contains(collection) {
            Some(ScopeKind::Global)
        } else {
            None
        }
    }
}

/// Equality conditions for a query, plus the bypass marker.
///
/// Field names always come from repository code, never from user
/// input; values are bound as query parameters.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, serde_json::Value)>,
    bypass: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Explicit, auditable opt-out of automatic tenant scoping.
    /// Reserved for trusted administrative/cross-tenant code paths.
    pub fn bypass_tenant(mut self) -> Self {
        self.bypass = true;
        self
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.conditions.iter().any(|(f, _)| f == field)
    }

    pub fn conditions(&self) -> &[(String, serde_json::Value)] {
        &self.conditions
    }
}

/// Field values for a create or update.
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: Vec<(String, serde_json::Value)>,
    unset: Vec<String>,
    bypass: bool,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// Clears an optional field (sets it to NONE) on update.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Skip tenant stamping for this create (trusted code paths only).
    pub fn bypass_tenant(mut self) -> Self {
        self.bypass = true;
        self
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|(f, _)| f == field)
    }

    pub fn fields(&self) -> &[(String, serde_json::Value)] {
        &self.fields
    }
}

/// Resolves a filter against the collection's scope classification and
/// the ambient tenant. Pure; unit-tested without a database.
fn resolve_filter(
    collection: &str,
    kind: ScopeKind,
    mut filter: Filter,
    ambient: Option<Uuid>,
) -> Result<Filter, DbError> {
    if kind == ScopeKind::Global {
        return Ok(filter);
    }
    if filter.has_field(ORGANIZATION_ID_FIELD) {
        return Ok(filter);
    }
    if filter.bypass {
        warn!(collection, "tenant scoping bypassed");
        return Ok(filter);
    }
    match ambient {
        Some(org) => {
            filter
                .conditions
                .push((ORGANIZATION_ID_FIELD.into(), org.to_string().into()));
            Ok(filter)
        }
        None => Err(DbError::ScopingViolation {
            collection: collection.into(),
        }),
    }
}

/// Stamps the ambient tenant onto a new document that does not yet
/// carry one. Pure; unit-tested without a database.
fn stamp_document(
    collection: &str,
    kind: ScopeKind,
    mut doc: Document,
    ambient: Option<Uuid>,
) -> Result<Document, DbError> {
    if kind == ScopeKind::Global || doc.has_field(ORGANIZATION_ID_FIELD) {
        return Ok(doc);
    }
    if doc.bypass {
        warn!(collection, "tenant stamping bypassed on create");
        return Ok(doc);
    }
    match ambient {
        Some(org) => {
            doc.fields
                .push((ORGANIZATION_ID_FIELD.into(), org.to_string().into()));
            Ok(doc)
        }
        None => Err(DbError::ScopingViolation {
            collection: collection.into(),
        }),
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

/// The only database entry point handed to repositories.
pub struct ScopedStore<C: Connection> {
    db: Surreal<C>,
    registry: Arc<ScopeRegistry>,
}

impl<C: Connection> Clone for ScopedStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C: Connection> ScopedStore<C> {
    pub fn new(db: Surreal<C>, registry: ScopeRegistry) -> Self {
        Self {
            db,
            registry: Arc::new(registry),
        }
    }

    /// Returns a handle for one collection, rejecting collections in
    /// neither allow-list.
    pub fn collection(&self, name: &str) -> Result<ScopedCollection<C>, DbError> {
        let kind = self
            .registry
            .classify(name)
            .ok_or_else(|| DbError::UnknownCollection {
                collection: name.into(),
            })?;
        Ok(ScopedCollection {
            db: self.db.clone(),
            collection: name.to_string(),
            kind,
        })
    }
}

/// Scoped operations against a single collection.
pub struct ScopedCollection<C: Connection> {
    db: Surreal<C>,
    collection: String,
    kind: ScopeKind,
}

impl<C: Connection> ScopedCollection<C> {
    fn resolve(&self, filter: Filter) -> Result<Filter, DbError> {
        resolve_filter(&self.collection, self.kind, filter, current_tenant())
    }

    fn where_clause(conditions: &[(String, serde_json::Value)]) -> String {
        if conditions.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = conditions
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{field} = $w{i}"))
            .collect();
        format!(" WHERE {}", parts.join(" AND "))
    }

    fn bind_conditions(
        mut query: surrealdb::method::Query<C>,
        conditions: Vec<(String, serde_json::Value)>,
    ) -> surrealdb::method::Query<C> {
        for (i, (_, value)) in conditions.into_iter().enumerate() {
            query = query.bind((format!("w{i}"), value));
        }
        query
    }

    /// Multi-read. Rows must select `meta::id(id) AS record_id` via
    /// the default projection used here.
    pub async fn find<T: SurrealValue>(&self, filter: Filter) -> Result<Vec<T>, DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM {}{}",
            self.collection,
            Self::where_clause(resolved.conditions()),
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions);
        let mut result = query.await?;
        Ok(result.take(0)?)
    }

    /// Paged multi-read with a fixed ordering column.
    pub async fn find_page<T: SurrealValue>(
        &self,
        filter: Filter,
        order_by: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<T>, DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM {}{} \
             ORDER BY {} ASC LIMIT $limit START $offset",
            self.collection,
            Self::where_clause(resolved.conditions()),
            order_by,
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions)
            .bind(("limit", limit))
            .bind(("offset", offset));
        let mut result = query.await?;
        Ok(result.take(0)?)
    }

    /// Single-read by filter.
    pub async fn find_one<T: SurrealValue>(&self, filter: Filter) -> Result<Option<T>, DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM {}{} LIMIT 1",
            self.collection,
            Self::where_clause(resolved.conditions()),
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions);
        let mut result = query.await?;
        let rows: Vec<T> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Single-read by record id; the tenant condition still applies.
    pub async fn get<T: SurrealValue>(
        &self,
        id: Uuid,
        filter: Filter,
    ) -> Result<Option<T>, DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "SELECT * FROM type::record('{}', $id){}",
            self.collection,
            Self::where_clause(resolved.conditions()),
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions)
            .bind(("id", id.to_string()));
        let mut result = query.await?;
        let rows: Vec<T> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "SELECT count() AS total FROM {}{} GROUP ALL",
            self.collection,
            Self::where_clause(resolved.conditions()),
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions);
        let mut result = query.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    pub async fn exists(&self, filter: Filter) -> Result<bool, DbError> {
        Ok(self.count(filter).await? > 0)
    }

    /// Creates a record, stamping `organization_id` from the ambient
    /// tenant when the document does not already carry one.
    pub async fn create<T: SurrealValue>(&self, id: Uuid, doc: Document) -> Result<T, DbError> {
        let id_str = id.to_string();
        let stamped = stamp_document(&self.collection, self.kind, doc, current_tenant())?;

        let sets: Vec<String> = stamped
            .fields()
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{field} = $c{i}"))
            .collect();
        let sql = format!(
            "CREATE type::record('{}', $id) SET {}",
            self.collection,
            sets.join(", "),
        );

        let mut query = self.db.query(&sql).bind(("id", id_str.clone()));
        for (i, (_, value)) in stamped.fields.into_iter().enumerate() {
            query = query.bind((format!("c{i}"), value));
        }
        let result = query.await?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<T> = result.take(0)?;
        rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: self.collection.clone(),
            id: id_str,
        })
    }

    /// Single-record update; the tenant condition applies, so an
    /// update cannot reach across tenants even with a known id.
    pub async fn update_by_id<T: SurrealValue>(
        &self,
        id: Uuid,
        filter: Filter,
        sets: Document,
    ) -> Result<Option<T>, DbError> {
        let resolved = self.resolve(filter)?;
        let mut clauses: Vec<String> = sets
            .fields()
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{field} = $s{i}"))
            .collect();
        for field in &sets.unset {
            clauses.push(format!("{field} = NONE"));
        }
        clauses.push("updated_at = time::now()".into());

        let sql = format!(
            "UPDATE type::record('{}', $id) SET {}{}",
            self.collection,
            clauses.join(", "),
            Self::where_clause(resolved.conditions()),
        );

        let mut query = self.db.query(&sql).bind(("id", id.to_string()));
        for (i, (_, value)) in sets.fields.into_iter().enumerate() {
            query = query.bind((format!("s{i}"), value));
        }
        query = Self::bind_conditions(query, resolved.conditions);
        let result = query.await?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<T> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Multi-record update under the resolved filter.
    pub async fn update_many(&self, filter: Filter, sets: Document) -> Result<(), DbError> {
        let resolved = self.resolve(filter)?;
        let mut clauses: Vec<String> = sets
            .fields()
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{field} = $s{i}"))
            .collect();
        for field in &sets.unset {
            clauses.push(format!("{field} = NONE"));
        }
        clauses.push("updated_at = time::now()".into());

        let sql = format!(
            "UPDATE {} SET {}{}",
            self.collection,
            clauses.join(", "),
            Self::where_clause(resolved.conditions()),
        );

        let mut query = self.db.query(&sql);
        for (i, (_, value)) in sets.fields.into_iter().enumerate() {
            query = query.bind((format!("s{i}"), value));
        }
        query = Self::bind_conditions(query, resolved.conditions);
        query
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_by_id(&self, id: Uuid, filter: Filter) -> Result<(), DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "DELETE type::record('{}', $id){}",
            self.collection,
            Self::where_clause(resolved.conditions()),
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions)
            .bind(("id", id.to_string()));
        query.await?;
        Ok(())
    }

    pub async fn delete_many(&self, filter: Filter) -> Result<(), DbError> {
        let resolved = self.resolve(filter)?;
        let sql = format!(
            "DELETE {}{}",
            self.collection,
            Self::where_clause(resolved.conditions()),
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions);
        query.await?;
        Ok(())
    }

    /// Aggregate with a projection and optional grouping. The tenant
    /// match is resolved into the WHERE clause ahead of grouping, the
    /// equivalent of prepending a match stage to a pipeline.
    pub async fn aggregate<T: SurrealValue>(
        &self,
        projection: &str,
        filter: Filter,
        group_by: Option<&str>,
    ) -> Result<Vec<T>, DbError> {
        let resolved = self.resolve(filter)?;
        let grouping = match group_by {
            Some(fields) => format!(" GROUP BY {fields}"),
            None => " GROUP ALL".into(),
        };
        let sql = format!(
            "SELECT {} FROM {}{}{}",
            projection,
            self.collection,
            Self::where_clause(resolved.conditions()),
            grouping,
        );
        let query = Self::bind_conditions(self.db.query(&sql), resolved.conditions);
        let mut result = query.await?;
        Ok(result.take(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn registry_defaults_classify_both_ways() {
        let registry = ScopeRegistry::with_defaults();
        assert_eq!(registry.classify("task"), Some(ScopeKind::Scoped));
        assert_eq!(registry.classify("setting"), Some(ScopeKind::Scoped));
        assert_eq!(registry.classify("organization"), Some(ScopeKind::Global));
        assert_eq!(registry.classify("role"), Some(ScopeKind::Global));
        assert_eq!(registry.classify("invoice"), None);
    }

    #[test]
    fn scoped_filter_gets_tenant_injected() {
        let org = org();
        let filter = Filter::new().eq("status", "done");
        let resolved = resolve_filter("task", ScopeKind::Scoped, filter, Some(org)).unwrap();
        assert!(resolved.has_field(ORGANIZATION_ID_FIELD));
        assert_eq!(
            resolved.conditions()[1].1,
            serde_json::Value::String(org.to_string())
        );
        // The caller's own condition is preserved.
        assert_eq!(resolved.conditions()[0].0, "status");
    }

    #[test]
    fn explicit_tenant_filter_left_untouched() {
        let explicit = org();
        let ambient = org();
        let filter = Filter::new().eq(ORGANIZATION_ID_FIELD, explicit.to_string());
        let resolved = resolve_filter("task", ScopeKind::Scoped, filter, Some(ambient)).unwrap();
        assert_eq!(resolved.conditions().len(), 1);
        assert_eq!(
            resolved.conditions()[0].1,
            serde_json::Value::String(explicit.to_string())
        );
    }

    #[test]
    fn bypass_leaves_filter_unscoped() {
        let filter = Filter::new().eq("status", "done").bypass_tenant();
        let resolved = resolve_filter("task", ScopeKind::Scoped, filter, Some(org())).unwrap();
        assert_eq!(resolved.conditions().len(), 1);
        assert!(!resolved.has_field(ORGANIZATION_ID_FIELD));
    }

    #[test]
    fn global_collection_never_scoped() {
        let resolved =
            resolve_filter("role", ScopeKind::Global, Filter::new(), Some(org())).unwrap();
        assert!(resolved.conditions().is_empty());
    }

    #[test]
    fn no_context_fails_closed() {
        let err = resolve_filter("task", ScopeKind::Scoped, Filter::new(), None).unwrap_err();
        match err {
            DbError::ScopingViolation { collection } => assert_eq!(collection, "task"),
            other => panic!("expected ScopingViolation, got {other:?}"),
        }
    }

    #[test]
    fn create_stamps_ambient_tenant() {
        let org = org();
        let doc = Document::new().set("title", "write release notes");
        let stamped = stamp_document("task", ScopeKind::Scoped, doc, Some(org)).unwrap();
        assert!(stamped.has_field(ORGANIZATION_ID_FIELD));
    }

    #[test]
    fn create_keeps_explicit_tenant() {
        let explicit = org();
        let doc = Document::new().set(ORGANIZATION_ID_FIELD, explicit.to_string());
        let stamped = stamp_document("task", ScopeKind::Scoped, doc, Some(org())).unwrap();
        assert_eq!(stamped.fields().len(), 1);
        assert_eq!(
            stamped.fields()[0].1,
            serde_json::Value::String(explicit.to_string())
        );
    }

    #[test]
    fn create_without_context_fails_closed() {
        let doc = Document::new().set("title", "background job");
        let err = stamp_document("task", ScopeKind::Scoped, doc, None).unwrap_err();
        assert!(matches!(err, DbError::ScopingViolation { .. }));
    }

    #[test]
    fn bypassed_create_skips_stamping() {
        let doc = Document::new().set("title", "migration fixup").bypass_tenant();
        let stamped = stamp_document("task", ScopeKind::Scoped, doc, None).unwrap();
        assert!(!stamped.has_field(ORGANIZATION_ID_FIELD));
    }
}
