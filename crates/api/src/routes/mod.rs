//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod admin;
pub mod agent;
pub mod bank;
pub mod billing;
pub mod business;
pub mod health;
pub mod subscriptions;
pub mod tax;
pub mod transactions;

/// Routes reachable without a bearer token.
///
/// The billing webhook authenticates with its own shared secret.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(subscriptions::public_routes())
        .merge(billing::routes())
}

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(subscriptions::routes())
        .merge(transactions::routes())
        .merge(tax::routes())
        .merge(business::routes())
        .merge(bank::routes())
        .merge(agent::routes())
        .merge(admin::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(public_routes()).merge(protected_routes)
}
