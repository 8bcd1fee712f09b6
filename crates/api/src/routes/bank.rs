//! Bank account routes.
//!
//! Only the entitlement side of bank integration lives here. Fetching
//! statements from banks is done by an external collaborator.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use monetrax_db::BankAccountRepository;
use monetrax_db::repositories::LinkBankAccountInput;
use serde_json::json;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the bank routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bank/accounts", get(list_accounts).post(link_account))
        .route("/bank/sync", post(manual_sync))
        .route("/bank/status", get(sync_status))
}

/// GET `/bank/accounts` - Linked accounts.
async fn list_accounts(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let accounts = BankAccountRepository::new((*state.db).clone())
        .list(auth.tenant_id())
        .await?;
    Ok((StatusCode::OK, Json(json!({ "accounts": accounts }))).into_response())
}

/// POST `/bank/accounts` - Link an account, within the plan's account limit.
async fn link_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<LinkBankAccountInput>,
) -> Result<Response, ApiError> {
    let account = BankAccountRepository::new((*state.db).clone())
        .link(auth.tenant_id(), input, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(account)).into_response())
}

/// POST `/bank/sync` - Use one of today's manual syncs.
async fn manual_sync(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let status = BankAccountRepository::new((*state.db).clone())
        .manual_sync(auth.tenant_id(), Utc::now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(status)).into_response())
}

/// GET `/bank/status` - Sync cadence and today's manual sync allowance.
async fn sync_status(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let status = BankAccountRepository::new((*state.db).clone())
        .status(auth.tenant_id(), Utc::now())
        .await?;
    Ok((StatusCode::OK, Json(status)).into_response())
}
