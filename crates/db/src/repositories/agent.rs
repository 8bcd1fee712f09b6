//! Agent registry.
//!
//! Agents are users allowed to issue promotional signups. Each carries a
//! unique tag that is stamped on the businesses they onboard.

use chrono::{DateTime, Utc};
use monetrax_core::subscription::{AgentTag, PromoError};
use monetrax_shared::types::UserId;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use serde::Serialize;
use tracing::info;

use super::{db_time, is_unique_violation};
use crate::entities::agents;

/// Error types for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Another agent already uses the tag.
    #[error("Agent tag already taken: {0}")]
    TagTaken(String),

    /// The user is not an agent.
    #[error("Agent not found: {0}")]
    NotFound(UserId),

    /// A stored tag no longer parses.
    #[error(transparent)]
    Promo(#[from] PromoError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRecord {
    /// The agent's user.
    pub user_id: UserId,
    /// Tag stamped on onboarded businesses.
    pub agent_tag: AgentTag,
    /// When the user became an agent.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<agents::Model> for AgentRecord {
    type Error = PromoError;

    fn try_from(model: agents::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from_uuid(model.user_id),
            agent_tag: AgentTag::parse(&model.agent_tag)?,
            created_at: model.created_at.to_utc(),
        })
    }
}

/// Agent repository.
#[derive(Debug, Clone)]
pub struct AgentRepository {
    db: DatabaseConnection,
}

impl AgentRepository {
    /// Creates a new agent repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Looks up an agent by user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, user_id: UserId) -> Result<Option<AgentRecord>, AgentError> {
        agents::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await?
            .map(AgentRecord::try_from)
            .transpose()
            .map_err(AgentError::from)
    }

    /// Makes `user_id` an agent, or changes an existing agent's tag.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::TagTaken` if another agent holds the tag.
    pub async fn promote(
        &self,
        user_id: UserId,
        tag: AgentTag,
        promoted_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<AgentRecord, AgentError> {
        let created_at = db_time(now);
        let agent = agents::ActiveModel {
            user_id: Set(user_id.into_inner()),
            agent_tag: Set(tag.as_str().to_string()),
            promoted_by: Set(promoted_by.into_inner()),
            created_at: Set(created_at.into()),
        };

        agents::Entity::insert(agent)
            .on_conflict(
                OnConflict::column(agents::Column::UserId)
                    .update_columns([agents::Column::AgentTag, agents::Column::PromotedBy])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AgentError::TagTaken(tag.as_str().to_string())
                } else {
                    AgentError::Database(e)
                }
            })?;

        info!(user_id = %user_id, agent_tag = %tag.as_str(), promoted_by = %promoted_by, "Agent promoted");

        self.find(user_id)
            .await?
            .ok_or(AgentError::NotFound(user_id))
    }

    /// Removes agent rights. Past signups keep their tag.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotFound` if the user is not an agent.
    pub async fn revoke(&self, user_id: UserId) -> Result<(), AgentError> {
        let result = agents::Entity::delete_by_id(user_id.into_inner())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AgentError::NotFound(user_id));
        }

        info!(user_id = %user_id, "Agent revoked");
        Ok(())
    }
}
