//! Team domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a member holds within a team (distinct from the RBAC role).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TeamMemberRole {
    Admin,
    Manager,
    Member,
}

impl TeamMemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamMemberRole::Admin => "admin",
            TeamMemberRole::Manager => "manager",
            TeamMemberRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(TeamMemberRole::Admin),
            "manager" => Some(TeamMemberRole::Manager),
            "member" => Some(TeamMemberRole::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: Uuid,
    pub role: TeamMemberRole,
    pub joined_at: DateTime<Utc>,
}

/// A team within an organization. Membership is an embedded list;
/// the membership escalation check consults it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub members: Vec<TeamMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    /// Stamped from the ambient tenant context when `None`.
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
}
