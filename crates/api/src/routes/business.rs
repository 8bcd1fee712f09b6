//! Business profile routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use monetrax_core::tenant::BusinessUpdate;
use monetrax_db::BusinessRepository;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the business profile routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/business", get(get_business).put(update_business))
}

/// GET `/business` - The tenant's profile, created on first access.
async fn get_business(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let business = BusinessRepository::new((*state.db).clone())
        .get_or_create(auth.tenant_id())
        .await?;
    Ok((StatusCode::OK, Json(business)).into_response())
}

/// PUT `/business` - Update name, type, industry or tax ID.
async fn update_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<BusinessUpdate>,
) -> Result<Response, ApiError> {
    let business = BusinessRepository::new((*state.db).clone())
        .update(auth.tenant_id(), update)
        .await?;
    Ok((StatusCode::OK, Json(business)).into_response())
}
