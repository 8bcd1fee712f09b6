//! Subscription and entitlement routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use monetrax_core::subscription::{
    Action, EntitlementGate, Feature, PlanFeatures, Subscription, SubscriptionPlan, Tier,
    UsageReport, UsageTracker,
};
use monetrax_db::repositories::{EventOutcome, TenantSnapshot};
use monetrax_db::{PlanRepository, SubscriptionRepository};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Routes that need no authentication.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/subscriptions/plans", get(list_plans))
}

/// Creates the subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/current", get(current_subscription))
        .route("/subscriptions/usage", get(usage))
        .route("/subscriptions/feature-check/{feature}", get(feature_check))
        .route("/subscriptions/cancel", post(cancel))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Usage of every metered resource.
#[derive(Debug, Serialize)]
pub struct UsageSummary {
    /// Transactions in the current quota period.
    pub transactions: UsageReport,
    /// Linked bank accounts.
    pub bank_accounts: UsageReport,
    /// Manual syncs today (UTC).
    pub manual_syncs_today: UsageReport,
    /// Start of the current quota period.
    pub period_start: DateTime<Utc>,
}

/// Response for the current subscription.
#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    /// The subscription record.
    pub subscription: Subscription,
    /// Tier whose entitlements apply right now.
    pub effective_tier: Tier,
    /// The applicable plan.
    pub plan: SubscriptionPlan,
    /// Usage against the plan.
    pub usage: UsageSummary,
}

/// Response for a feature check.
#[derive(Debug, Serialize)]
pub struct FeatureCheckResponse {
    /// The feature.
    pub feature: Feature,
    /// Whether the tenant may use it now.
    pub has_access: bool,
    /// Tier whose entitlements apply.
    pub current_tier: Tier,
    /// Lowest tier that would grant access, when access is denied.
    pub upgrade_required: Option<Tier>,
}

fn usage_summary(snapshot: &TenantSnapshot, features: &PlanFeatures, now: DateTime<Utc>) -> UsageSummary {
    let state = &snapshot.state;
    let period_start = UsageTracker::quota_period_start(&state.subscription, now);
    UsageSummary {
        transactions: UsageReport::new(
            UsageTracker::transactions_used(&state.usage, period_start),
            features.transactions_per_month,
        ),
        bank_accounts: UsageReport::new(state.linked_bank_accounts, features.bank_accounts_max),
        manual_syncs_today: UsageReport::new(
            state.usage.syncs_on(now.date_naive()),
            features.manual_syncs_per_day,
        ),
        period_start,
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/subscriptions/plans` - The plan catalog.
async fn list_plans(State(state): State<AppState>) -> Result<Response, ApiError> {
    let catalog = PlanRepository::new((*state.db).clone()).catalog().await?;
    let plans: Vec<&SubscriptionPlan> = catalog.plans().collect();
    Ok((StatusCode::OK, Json(json!({ "plans": plans }))).into_response())
}

/// GET `/subscriptions/current` - The tenant's subscription with usage.
async fn current_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let snapshot = SubscriptionRepository::new((*state.db).clone())
        .snapshot(auth.tenant_id(), now)
        .await?;

    let effective_tier = snapshot.subscription().effective_tier();
    let plan = snapshot.catalog.plan(effective_tier)?.clone();
    let usage = usage_summary(&snapshot, &plan.features, now);

    Ok((
        StatusCode::OK,
        Json(CurrentSubscriptionResponse {
            subscription: snapshot.state.subscription,
            effective_tier,
            plan,
            usage,
        }),
    )
        .into_response())
}

/// GET `/subscriptions/usage` - Usage report with tier info.
async fn usage(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let now = Utc::now();
    let snapshot = SubscriptionRepository::new((*state.db).clone())
        .snapshot(auth.tenant_id(), now)
        .await?;

    let gate = EntitlementGate::new(&snapshot.catalog);
    let features = gate.features_for(snapshot.subscription())?;
    let summary = usage_summary(&snapshot, features, now);

    Ok((
        StatusCode::OK,
        Json(json!({
            "tier": snapshot.subscription().effective_tier(),
            "status": snapshot.subscription().status,
            "usage": summary,
        })),
    )
        .into_response())
}

/// GET `/subscriptions/feature-check/{feature}` - Whether a feature is available.
async fn feature_check(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(feature): Path<String>,
) -> Result<Response, ApiError> {
    let Some(feature) = Feature::parse(&feature) else {
        return Err(ApiError::not_found(format!("Unknown feature: {feature}")));
    };

    let now = Utc::now();
    let snapshot = SubscriptionRepository::new((*state.db).clone())
        .snapshot(auth.tenant_id(), now)
        .await?;

    let gate = EntitlementGate::new(&snapshot.catalog);
    let has_access = gate
        .check(&snapshot.state, Action::UseFeature(feature), now)?
        .is_allowed();
    let current_tier = snapshot.subscription().effective_tier();
    let upgrade_required = if has_access {
        None
    } else {
        gate.upgrade_target(current_tier, feature)
    };

    Ok((
        StatusCode::OK,
        Json(FeatureCheckResponse {
            feature,
            has_access,
            current_tier,
            upgrade_required,
        }),
    )
        .into_response())
}

/// POST `/subscriptions/cancel` - Cancel at the end of the current period.
async fn cancel(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let outcome = SubscriptionRepository::new((*state.db).clone())
        .request_cancellation(auth.tenant_id(), Utc::now())
        .await?;

    info!(
        tenant_id = %auth.tenant_id(),
        user_id = %auth.user_id(),
        outcome = outcome.as_str(),
        "Cancellation requested"
    );

    let body = match outcome {
        EventOutcome::Applied(subscription) => json!({
            "status": "cancelling",
            "subscription": subscription,
            "message": "Your plan stays active until the end of the current period",
        }),
        other => json!({ "status": other.as_str() }),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
