//! SurrealDB implementation of [`AuditSink`].
//!
//! Audit writes are a side channel: a failed append must never fail
//! the operation being audited, so errors are logged and swallowed
//! here. Events with no resolvable organization (no explicit id, no
//! ambient tenant) are dropped with a warning rather than written
//! unattributed.

use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use taskhive_core::models::audit::CreateAuditEvent;
use taskhive_core::repository::AuditSink;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbError;
use crate::scope::{Document, ScopedStore, ORGANIZATION_ID_FIELD};

const COLLECTION: &str = "activity_log";

#[derive(Debug, SurrealValue)]
struct AuditRow {
    #[allow(dead_code)]
    action: String,
}

/// SurrealDB implementation of the audit sink.
#[derive(Clone)]
pub struct SurrealAuditSink<C: Connection> {
    store: ScopedStore<C>,
}

impl<C: Connection> SurrealAuditSink<C> {
    pub fn new(store: ScopedStore<C>) -> Self {
        Self { store }
    }

    async fn append(&self, event: CreateAuditEvent) -> Result<(), DbError> {
        let id = Uuid::new_v4();

        let mut doc = Document::new()
            .set("user_id", event.user_id.to_string())
            .set("action", event.action)
            .set("entity_type", event.entity_type)
            .set("details", event.details);
        if let Some(entity_id) = event.entity_id {
            doc = doc.set("entity_id", entity_id.to_string());
        }
        if let Some(org) = event.organization_id {
            doc = doc.set(ORGANIZATION_ID_FIELD, org.to_string());
        }

        let _: AuditRow = self.store.collection(COLLECTION)?.create(id, doc).await?;
        Ok(())
    }
}

impl<C: Connection> AuditSink for SurrealAuditSink<C> {
    async fn record(&self, event: CreateAuditEvent) {
        let action = event.action.clone();
        if let Err(e) = self.append(event).await {
            warn!(action, error = %e, "failed to record audit event");
        }
    }
}
