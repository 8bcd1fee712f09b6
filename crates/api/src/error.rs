//! Conversion of domain and repository errors into HTTP responses.
//!
//! Every error body has the shape `{"error": <code>, "message": <text>}`.
//! Policy denials and configuration faults use their reason code verbatim
//! as `error`, so clients can branch on it.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use monetrax_core::subscription::{
    DenialReason, LifecycleError, PromoError, SubscriptionError,
};
use monetrax_core::tax::TaxError;
use monetrax_db::repositories::{
    AgentError, BankError, BusinessError, PlanError, PromoRepoError, SubscriptionRepoError,
    TaxRuleError, TransactionError,
};
use monetrax_shared::AppError;
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

/// Error returned from route handlers.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// 403 for callers whose role does not allow the action.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(AppError::Forbidden(message.into()))
    }

    /// 401 for requests without valid credentials.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(AppError::Unauthorized(message.into()))
    }

    /// 400 for malformed input.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }

    /// 404 for a missing resource.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(AppError::NotFound(message.into()))
    }

    /// A tax rule set rejected while an operator is publishing it (422).
    #[must_use]
    pub fn rejected_rules(err: TaxRuleError) -> Self {
        match err {
            TaxRuleError::Rules(e) => Self(AppError::InvalidConfiguration {
                reason: e.reason(),
                message: e.to_string(),
            }),
            other => other.into(),
        }
    }

    /// A plan rejected while an operator is editing the catalog (422).
    #[must_use]
    pub fn rejected_plan(err: PlanError) -> Self {
        match err {
            PlanError::Catalog(e) => Self(AppError::InvalidConfiguration {
                reason: e.reason(),
                message: e.to_string(),
            }),
            other => other.into(),
        }
    }

    fn fault(reason: &'static str, detail: &str) -> Self {
        error!(reason, detail, "refusing to compute from broken configuration");
        Self(AppError::ConfigurationFault {
            reason,
            message: "Stored configuration is invalid; the request was refused".to_string(),
        })
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self.0 {
            AppError::Database(detail) | AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                "An internal error occurred".to_string()
            }
            AppError::PolicyDenied { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::ConfigurationFault { message, .. } => message.clone(),
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message
            })),
        )
            .into_response()
    }
}

// ============================================================================
// Domain errors
// ============================================================================

impl From<DenialReason> for ApiError {
    fn from(reason: DenialReason) -> Self {
        Self(AppError::PolicyDenied {
            reason: reason.as_str(),
            message: reason.message().to_string(),
        })
    }
}

impl From<TaxError> for ApiError {
    fn from(err: TaxError) -> Self {
        match err {
            TaxError::InvalidTransaction(msg) | TaxError::InvalidPeriod(msg) => {
                Self(AppError::Validation(msg))
            }
            TaxError::InvalidBracketConfig(_) | TaxError::NoRuleSet => {
                Self::fault(err.reason(), &err.to_string())
            }
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        Self::fault(err.reason(), &err.to_string())
    }
}

impl From<PromoError> for ApiError {
    fn from(err: PromoError) -> Self {
        match err {
            PromoError::AlreadyUsedPromo => Self(AppError::Conflict {
                reason: err.reason(),
                message: "This identifier has already used a promotion or paid before"
                    .to_string(),
            }),
            PromoError::Catalog(e) => e.into(),
            PromoError::InvalidIdentifier(_)
            | PromoError::InvalidAgentTag(_)
            | PromoError::TierNotPromotable(_) => Self(AppError::Validation(err.to_string())),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::FreeCheckout | LifecycleError::InvalidPeriod => {
                Self(AppError::Validation(err.to_string()))
            }
            LifecycleError::NothingToCancel | LifecycleError::NothingToRenew => {
                Self(AppError::Conflict {
                    reason: err.reason(),
                    message: err.to_string(),
                })
            }
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

// ============================================================================
// Repository errors
// ============================================================================

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Catalog(e) => e.into(),
            PlanError::Database(e) => e.into(),
        }
    }
}

impl From<TaxRuleError> for ApiError {
    fn from(err: TaxRuleError) -> Self {
        match err {
            TaxRuleError::Rules(e) => e.into(),
            TaxRuleError::Corrupt(..) => Self::fault("invalid_bracket_config", &err.to_string()),
            TaxRuleError::Database(e) => e.into(),
        }
    }
}

impl From<BusinessError> for ApiError {
    fn from(err: BusinessError) -> Self {
        match err {
            BusinessError::Validation(msg) => Self(AppError::Validation(msg)),
            BusinessError::Database(e) => e.into(),
        }
    }
}

impl From<SubscriptionRepoError> for ApiError {
    fn from(err: SubscriptionRepoError) -> Self {
        match err {
            SubscriptionRepoError::Plan(e) => e.into(),
            SubscriptionRepoError::Lifecycle(e) => e.into(),
            SubscriptionRepoError::UnknownTenant(id) => Self(AppError::UnknownTenant(id.into_inner())),
            SubscriptionRepoError::Database(e) => e.into(),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Invalid(e) => e.into(),
            TransactionError::Denied(reason) => reason.into(),
            TransactionError::NotFound(id) => Self::not_found(format!("Transaction {id}")),
            TransactionError::Plan(e) => e.into(),
            TransactionError::Catalog(e) => e.into(),
            TransactionError::Rules(e) => e.into(),
            TransactionError::Database(e) => e.into(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::TagTaken(tag) => Self(AppError::Conflict {
                reason: "agent_tag_taken",
                message: format!("Agent tag {tag} is already in use"),
            }),
            AgentError::NotFound(id) => Self::not_found(format!("Agent {id}")),
            AgentError::Promo(e) => e.into(),
            AgentError::Database(e) => e.into(),
        }
    }
}

impl From<PromoRepoError> for ApiError {
    fn from(err: PromoRepoError) -> Self {
        match err {
            PromoRepoError::Promo(e) => e.into(),
            PromoRepoError::Plan(e) => e.into(),
            PromoRepoError::Corrupt(..) => Self(AppError::Internal(err.to_string())),
            PromoRepoError::Database(e) => e.into(),
        }
    }
}

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::Validation(msg) => Self(AppError::Validation(msg)),
            BankError::Denied(reason) => reason.into(),
            BankError::Plan(e) => e.into(),
            BankError::Catalog(e) => e.into(),
            BankError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use monetrax_core::subscription::Tier;
    use serde_json::Value;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_denial_reason_is_surfaced_verbatim() {
        let (status, body) = body_of(DenialReason::QuotaExceeded.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "quota_exceeded");
        assert_eq!(body["message"], DenialReason::QuotaExceeded.message());
    }

    #[tokio::test]
    async fn test_promo_reuse_is_conflict() {
        let (status, body) = body_of(PromoError::AlreadyUsedPromo.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_used_promo");
    }

    #[tokio::test]
    async fn test_rules_rejected_at_write_time_are_unprocessable() {
        let err = ApiError::rejected_rules(TaxRuleError::Rules(TaxError::InvalidBracketConfig(
            "brackets must end unbounded".into(),
        )));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_bracket_config");
    }

    #[tokio::test]
    async fn test_broken_rules_at_read_time_fail_closed() {
        let (status, body) = body_of(TaxError::NoRuleSet.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "invalid_bracket_config");

        let (status, body) =
            body_of(SubscriptionError::TierNotInCatalog(Tier::Business).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "invalid_catalog");
    }

    #[tokio::test]
    async fn test_database_details_are_hidden() {
        let (status, body) = body_of(DbErr::Custom("password=hunter2".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "database_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_not_found() {
        let tenant = monetrax_shared::types::TenantId::new();
        let (status, body) = body_of(SubscriptionRepoError::UnknownTenant(tenant).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_tenant");
    }
}
