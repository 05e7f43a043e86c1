//! SurrealDB implementation of [`TeamRepository`].
//!
//! Membership is an embedded list on the team record. Mutations read
//! the current list, rewrite it in memory, and store it back whole;
//! team sizes are bounded by organization limits, so the list stays
//! small.

use chrono::{DateTime, Utc};
use serde_json::json;
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::team::{CreateTeam, Team, TeamMember, TeamMemberRole};
use taskhive_core::repository::TeamRepository;
use uuid::Uuid;

use crate::error::DbError;
use crate::scope::{Document, Filter, ScopedStore, ORGANIZATION_ID_FIELD};

const COLLECTION: &str = "team";

#[derive(Debug, SurrealValue)]
struct TeamMemberRow {
    user_id: String,
    role: String,
    joined_at: String,
}

impl TeamMemberRow {
    fn try_into_member(self) -> Result<TeamMember, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Query(format!("invalid member UUID: {e}")))?;
        let role = TeamMemberRole::parse(&self.role)
            .ok_or_else(|| DbError::Query(format!("invalid member role: {}", self.role)))?;
        let joined_at = DateTime::parse_from_rfc3339(&self.joined_at)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| DbError::Query(format!("invalid join timestamp: {e}")))?;
        Ok(TeamMember {
            user_id,
            role,
            joined_at,
        })
    }
}

fn member_json(member: &TeamMember) -> serde_json::Value {
    json!({
        "user_id": member.user_id.to_string(),
        "role": member.role.as_str(),
        "joined_at": member.joined_at.to_rfc3339(),
    })
}

fn members_json(members: &[TeamMember]) -> serde_json::Value {
    serde_json::Value::Array(members.iter().map(member_json).collect())
}

#[derive(Debug, SurrealValue)]
struct TeamRow {
    organization_id: String,
    name: String,
    description: String,
    owner_id: String,
    members: Vec<TeamMemberRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_team(self, id: Uuid) -> Result<Team, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Query(format!("invalid organization UUID: {e}")))?;
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| DbError::Query(format!("invalid owner UUID: {e}")))?;
        let members = self
            .members
            .into_iter()
            .map(|m| m.try_into_member())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(Team {
            id,
            organization_id,
            name: self.name,
            description: self.description,
            owner_id,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Team repository.
#[derive(Clone)]
pub struct SurrealTeamRepository<C: Connection> {
    store: ScopedStore<C>,
}

impl<C: Connection> SurrealTeamRepository<C> {
    pub fn new(store: ScopedStore<C>) -> Self {
        Self { store }
    }

    async fn fetch(&self, id: Uuid) -> Result<Team, DbError> {
        let row: Option<TeamRow> = self
            .store
            .collection(COLLECTION)?
            .get(id, Filter::new())
            .await?;
        let row = row.ok_or(DbError::NotFound {
            entity: COLLECTION.into(),
            id: id.to_string(),
        })?;
        row.into_team(id)
    }

    async fn store_members(&self, id: Uuid, members: &[TeamMember]) -> Result<Team, DbError> {
        let doc = Document::new().set("members", members_json(members));
        let row: Option<TeamRow> = self
            .store
            .collection(COLLECTION)?
            .update_by_id(id, Filter::new(), doc)
            .await?;
        let row = row.ok_or(DbError::NotFound {
            entity: COLLECTION.into(),
            id: id.to_string(),
        })?;
        row.into_team(id)
    }
}

impl<C: Connection> TeamRepository for SurrealTeamRepository<C> {
    async fn create(&self, input: CreateTeam) -> TaskhiveResult<Team> {
        let id = Uuid::new_v4();

        // The owner starts out as an admin member.
        let owner = TeamMember {
            user_id: input.owner_id,
            role: TeamMemberRole::Admin,
            joined_at: Utc::now(),
        };

        let mut doc = Document::new()
            .set("name", input.name)
            .set("description", input.description)
            .set("owner_id", input.owner_id.to_string())
            .set("members", members_json(std::slice::from_ref(&owner)));
        if let Some(org) = input.organization_id {
            doc = doc.set(ORGANIZATION_ID_FIELD, org.to_string());
        }

        let row: TeamRow = self.store.collection(COLLECTION)?.create(id, doc).await?;
        Ok(row.into_team(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> TaskhiveResult<Team> {
        Ok(self.fetch(id).await?)
    }

    async fn add_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamMemberRole,
    ) -> TaskhiveResult<Team> {
        let team = self.fetch(team_id).await?;

        let mut members = team.members;
        match members.iter_mut().find(|m| m.user_id == user_id) {
            Some(existing) => existing.role = role,
            None => members.push(TeamMember {
                user_id,
                role,
                joined_at: Utc::now(),
            }),
        }

        Ok(self.store_members(team_id, &members).await?)
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> TaskhiveResult<Team> {
        let team = self.fetch(team_id).await?;

        let members: Vec<TeamMember> = team
            .members
            .into_iter()
            .filter(|m| m.user_id != user_id)
            .collect();

        Ok(self.store_members(team_id, &members).await?)
    }

    async fn is_member(&self, team_id: Uuid, user_id: Uuid) -> TaskhiveResult<bool> {
        let team = self.fetch(team_id).await?;
        Ok(team.owner_id == user_id || team.members.iter().any(|m| m.user_id == user_id))
    }
}
