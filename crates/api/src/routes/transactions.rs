//! Transaction routes.
//!
//! Manual entry and every ingestion path go through `POST /transactions`,
//! which consumes one unit of the monthly quota.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use chrono::Utc;
use monetrax_core::tax::NewTransaction;
use monetrax_db::TransactionRepository;
use monetrax_db::repositories::TransactionFilter;
use monetrax_shared::types::{PageRequest, PageResponse, TransactionId};
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/{transaction_id}", delete(delete_transaction))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/transactions` - List transactions with optional `from`, `to` and
/// `type` filters.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<TransactionFilter>,
    Query(page): Query<PageRequest>,
) -> Result<Response, ApiError> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(ApiError::validation("from must not be after to"));
    }

    let page = page.clamped();
    let (rows, total) = TransactionRepository::new((*state.db).clone())
        .list(auth.tenant_id(), filter, &page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(PageResponse::new(rows, page.page, page.per_page, total)),
    )
        .into_response())
}

/// POST `/transactions` - Record a transaction, subject to the plan's quota.
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<NewTransaction>,
) -> Result<Response, ApiError> {
    let record = TransactionRepository::new((*state.db).clone())
        .create(auth.tenant_id(), input, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// DELETE `/transactions/{transaction_id}` - Delete a transaction.
///
/// Quota already consumed is not refunded.
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, ApiError> {
    TransactionRepository::new((*state.db).clone())
        .delete(auth.tenant_id(), transaction_id)
        .await?;

    info!(
        user_id = %auth.user_id(),
        transaction_id = %transaction_id,
        "Transaction deleted by user"
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Transaction deleted",
            "id": transaction_id
        })),
    )
        .into_response())
}
