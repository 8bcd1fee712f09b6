//! Payment provider webhook.
//!
//! The provider authenticates with a shared secret in the `X-Webhook-Secret`
//! header instead of a bearer token.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use monetrax_core::subscription::BillingEvent;
use monetrax_db::SubscriptionRepository;
use monetrax_db::repositories::EventOutcome;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Creates the billing webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/billing/events", post(receive_event))
}

/// Constant-time comparison of the SHA-256 digests. An empty configured
/// secret matches nothing.
fn secret_matches(provided: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// POST `/billing/events` - Apply a subscription lifecycle event.
///
/// Replays answer 200 with `status: "duplicate"`; out-of-order events answer
/// 200 with `status: "stale"`.
async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<BillingEvent>,
) -> Result<Response, ApiError> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if !secret_matches(provided, &state.billing_webhook_secret) {
        warn!(event_id = %event.event_id, "Billing event with invalid webhook secret");
        return Err(ApiError::unauthorized("Invalid webhook secret"));
    }

    let outcome = SubscriptionRepository::new((*state.db).clone())
        .apply_billing_event(&event)
        .await?;

    info!(
        event_id = %event.event_id,
        tenant_id = %event.tenant_id,
        kind = event.kind.as_str(),
        outcome = outcome.as_str(),
        "Billing event received"
    );

    let body = match &outcome {
        EventOutcome::Applied(subscription) => json!({
            "status": outcome.as_str(),
            "subscription": subscription,
        }),
        EventOutcome::Stale | EventOutcome::Duplicate => json!({
            "status": outcome.as_str(),
            "event_id": event.event_id,
        }),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches("whsec_123", "whsec_123"));
        assert!(!secret_matches("whsec_124", "whsec_123"));
        assert!(!secret_matches("", "whsec_123"));
    }

    #[test]
    fn test_empty_configured_secret_rejects_everything() {
        assert!(!secret_matches("", ""));
        assert!(!secret_matches("anything", ""));
    }
}
