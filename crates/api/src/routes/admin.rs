//! Operator configuration routes.
//!
//! Tax rules and plans are edited here and take effect for later
//! computations only. Agent management is reserved for superadmins.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use monetrax_core::subscription::{AgentTag, SubscriptionPlan, Tier};
use monetrax_core::tax::TaxRuleSet;
use monetrax_db::{AgentRepository, PlanRepository, TaxRuleRepository};
use monetrax_shared::types::UserId;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/tax-rules", get(get_tax_rules).put(publish_tax_rules))
        .route("/admin/plans/{tier}", put(update_plan))
        .route(
            "/admin/agents/{user_id}",
            post(promote_agent).delete(revoke_agent),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for promoting a user to agent.
#[derive(Debug, Deserialize)]
pub struct PromoteAgentRequest {
    /// Agent initials, 2 to 5 letters or digits.
    pub agent_tag: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/admin/tax-rules` - The rule set currently in force.
async fn get_tax_rules(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    auth.require_operator()?;
    let version = TaxRuleRepository::new((*state.db).clone()).latest().await?;
    Ok((StatusCode::OK, Json(version)).into_response())
}

/// PUT `/admin/tax-rules` - Publish a new rule set version.
///
/// An invalid rule set is rejected with `invalid_bracket_config` and
/// nothing is stored.
async fn publish_tax_rules(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(rules): Json<TaxRuleSet>,
) -> Result<Response, ApiError> {
    auth.require_operator()?;
    let version = TaxRuleRepository::new((*state.db).clone())
        .publish(rules, auth.user_id(), Utc::now())
        .await
        .map_err(ApiError::rejected_rules)?;

    info!(
        user_id = %auth.user_id(),
        rule_set_id = %version.id,
        "Tax rules updated by operator"
    );
    Ok((StatusCode::CREATED, Json(version)).into_response())
}

/// PUT `/admin/plans/{tier}` - Replace one plan of the catalog.
async fn update_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tier): Path<Tier>,
    Json(plan): Json<SubscriptionPlan>,
) -> Result<Response, ApiError> {
    auth.require_operator()?;
    if plan.tier != tier {
        return Err(ApiError::validation(format!(
            "Plan tier {} does not match path tier {tier}",
            plan.tier
        )));
    }

    let catalog = PlanRepository::new((*state.db).clone())
        .update_plan(plan)
        .await
        .map_err(ApiError::rejected_plan)?;

    info!(user_id = %auth.user_id(), tier = %tier, "Plan updated by operator");

    let plans: Vec<&SubscriptionPlan> = catalog.plans().collect();
    Ok((StatusCode::OK, Json(json!({ "plans": plans }))).into_response())
}

/// POST `/admin/agents/{user_id}` - Make a user an agent.
async fn promote_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
    Json(request): Json<PromoteAgentRequest>,
) -> Result<Response, ApiError> {
    auth.require_superadmin()?;
    let tag = AgentTag::parse(&request.agent_tag)?;
    let agent = AgentRepository::new((*state.db).clone())
        .promote(user_id, tag, auth.user_id(), Utc::now())
        .await?;
    Ok((StatusCode::OK, Json(agent)).into_response())
}

/// DELETE `/admin/agents/{user_id}` - Revoke agent rights.
async fn revoke_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Response, ApiError> {
    auth.require_superadmin()?;
    AgentRepository::new((*state.db).clone())
        .revoke(user_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Agent revoked",
            "user_id": user_id
        })),
    )
        .into_response())
}
