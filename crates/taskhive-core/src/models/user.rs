//! User (actor) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated actor. Belongs to exactly one organization and
/// references exactly one role.
///
/// The failed-login counters are written by the authentication flow
/// (adjacent system) and read alongside the security settings bundle;
/// they are carried here because the actor record is the unit the
/// permission resolver loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Uuid,
    pub team_ids: Vec<Uuid>,
    pub avatar_url: String,
    pub failed_login_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Stamped from the ambient tenant context when `None`.
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    /// Already-hashed credential; hashing is the auth flow's concern.
    pub password_hash: String,
    pub role_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub team_ids: Option<Vec<Uuid>>,
    pub avatar_url: Option<String>,
    pub failed_login_attempts: Option<u32>,
    /// `Some(Some(t))` = set, `Some(None)` = clear, `None` = no change.
    pub lockout_until: Option<Option<DateTime<Utc>>>,
}
