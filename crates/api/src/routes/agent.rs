//! Agent routes for promotional signups.
//!
//! Callers must hold the `agent` role and have a registered agent tag.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use monetrax_core::subscription::{PromoIdentifier, PromotionalPricingService, Tier};
use monetrax_db::repositories::AgentRecord;
use monetrax_db::{AgentRepository, PlanRepository, PromoRepository};
use monetrax_shared::types::{PageRequest, PageResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the agent routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/agent/promotional-plans", get(promotional_plans))
        .route("/agent/check-user/{identifier}", get(check_user))
        .route("/agent/signup-user", post(signup_user))
        .route("/agent/signups", get(list_signups))
        .route("/agent/dashboard", get(dashboard))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a promotional signup.
#[derive(Debug, Deserialize)]
pub struct SignupUserRequest {
    /// Email address or phone number of the business owner.
    pub identifier: String,
    /// Tier to grant at the promotional price.
    pub tier: Tier,
}

/// Filter for the signup list.
#[derive(Debug, Deserialize)]
pub struct SignupsQuery {
    /// Only signups for this tier.
    pub tier: Option<Tier>,
}

async fn current_agent(state: &AppState, auth: &AuthUser) -> Result<AgentRecord, ApiError> {
    auth.require_agent()?;
    AgentRepository::new((*state.db).clone())
        .find(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::forbidden("No agent tag is registered for this user"))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/agent/promotional-plans` - Tiers an agent can offer, with savings.
async fn promotional_plans(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    current_agent(&state, &auth).await?;
    let catalog = PlanRepository::new((*state.db).clone()).catalog().await?;
    let plans = PromotionalPricingService::new(&catalog).promotional_plans();
    Ok((StatusCode::OK, Json(json!({ "plans": plans }))).into_response())
}

/// GET `/agent/check-user/{identifier}` - Whether an identifier can still
/// receive a promotion.
async fn check_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(identifier): Path<String>,
) -> Result<Response, ApiError> {
    current_agent(&state, &auth).await?;
    let identifier = PromoIdentifier::parse(&identifier)?;
    let status = PromoRepository::new((*state.db).clone())
        .check_user(&identifier)
        .await?;
    Ok((StatusCode::OK, Json(status)).into_response())
}

/// POST `/agent/signup-user` - Issue a promotional subscription.
async fn signup_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SignupUserRequest>,
) -> Result<Response, ApiError> {
    let agent = current_agent(&state, &auth).await?;
    let identifier = PromoIdentifier::parse(&request.identifier)?;
    let issuance = PromoRepository::new((*state.db).clone())
        .issue(&agent, identifier, request.tier, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "signup": issuance.signup,
            "subscription": issuance.subscription,
        })),
    )
        .into_response())
}

/// GET `/agent/signups` - Signups issued by the calling agent.
async fn list_signups(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<SignupsQuery>,
    Query(page): Query<PageRequest>,
) -> Result<Response, ApiError> {
    let agent = current_agent(&state, &auth).await?;
    let page = page.clamped();
    let (signups, total) = PromoRepository::new((*state.db).clone())
        .signups(agent.user_id, filter.tier, &page)
        .await?;
    Ok((
        StatusCode::OK,
        Json(PageResponse::new(signups, page.page, page.per_page, total)),
    )
        .into_response())
}

/// GET `/agent/dashboard` - Signup totals for the calling agent.
async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let agent = current_agent(&state, &auth).await?;
    let dashboard = PromoRepository::new((*state.db).clone())
        .dashboard(&agent)
        .await?;
    Ok((StatusCode::OK, Json(dashboard)).into_response())
}
