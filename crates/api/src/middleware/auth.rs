//! Authentication middleware for protected routes.
//!
//! Tokens are issued by the external identity provider. Their claims name
//! the user, the tenant the user acts for, and the user's role.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use monetrax_core::tenant::TenantContext;
use monetrax_shared::types::{TenantId, UserId};
use monetrax_shared::{Claims, JwtError, Role};
use serde_json::json;

use crate::{AppState, error::ApiError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let (error, message) = match e {
                JwtError::Expired => ("token_expired", "Token has expired"),
                _ => ("invalid_token", "Invalid or malformed token"),
            };

            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response()
        }
    }
}

/// Extractor for authenticated user claims.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let ctx = auth.tenant_context();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.0.user_id())
    }

    /// Returns the tenant the user acts for.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        TenantId::from_uuid(self.0.tenant_id())
    }

    /// Returns the user's role. Unknown roles read as `user`.
    #[must_use]
    pub fn role(&self) -> Role {
        self.0.role()
    }

    /// Per-request tenant context handed to the domain layer.
    #[must_use]
    pub fn tenant_context(&self) -> TenantContext {
        TenantContext {
            user_id: self.user_id(),
            tenant_id: self.tenant_id(),
            role: self.role(),
        }
    }

    /// Requires an operator role (admin or superadmin).
    pub fn require_operator(&self) -> Result<(), ApiError> {
        if self.role().is_operator() {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "You need admin or superadmin role to perform this action",
            ))
        }
    }

    /// Requires the superadmin role.
    pub fn require_superadmin(&self) -> Result<(), ApiError> {
        if self.role() == Role::Superadmin {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "You need superadmin role to perform this action",
            ))
        }
    }

    /// Requires the agent role.
    pub fn require_agent(&self) -> Result<(), ApiError> {
        if self.role() == Role::Agent {
            Ok(())
        } else {
            Err(ApiError::forbidden("Only agents can perform this action"))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn user(role: Role) -> AuthUser {
        AuthUser(Claims::new(Uuid::new_v4(), Uuid::new_v4(), role, Utc::now()))
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_tenant_context_comes_from_claims() {
        let auth = user(Role::Agent);
        let ctx = auth.tenant_context();
        assert_eq!(ctx.user_id.into_inner(), auth.0.sub);
        assert_eq!(ctx.tenant_id.into_inner(), auth.0.tenant);
        assert_eq!(ctx.role, Role::Agent);
    }

    #[rstest]
    #[case(Role::User, false, false, false)]
    #[case(Role::Agent, false, false, true)]
    #[case(Role::Admin, true, false, false)]
    #[case(Role::Superadmin, true, true, false)]
    fn test_role_guards(
        #[case] role: Role,
        #[case] operator: bool,
        #[case] superadmin: bool,
        #[case] agent: bool,
    ) {
        let auth = user(role);
        assert_eq!(auth.require_operator().is_ok(), operator);
        assert_eq!(auth.require_superadmin().is_ok(), superadmin);
        assert_eq!(auth.require_agent().is_ok(), agent);
    }
}
