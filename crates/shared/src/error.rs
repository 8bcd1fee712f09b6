//! Application-wide error types.
//!
//! Policy denials and configuration faults carry a machine-readable reason
//! code that is surfaced verbatim to API clients.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Access denied by role.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The tenant referenced by a request or event does not exist.
    #[error("Unknown tenant: {0}")]
    UnknownTenant(Uuid),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A subscription policy denied the action (quota, feature, sync limit).
    #[error("{message}")]
    PolicyDenied {
        /// Machine-readable reason, e.g. `quota_exceeded`.
        reason: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Conflict with existing state (e.g., promo already used).
    #[error("{message}")]
    Conflict {
        /// Machine-readable reason, e.g. `already_used_promo`.
        reason: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Operator configuration rejected at write time.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Machine-readable reason, e.g. `invalid_bracket_config`.
        reason: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Stored configuration is unusable; computation refused.
    #[error("Configuration fault: {message}")]
    ConfigurationFault {
        /// Machine-readable reason, e.g. `invalid_catalog`.
        reason: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) | Self::PolicyDenied { .. } => 403,
            Self::NotFound(_) | Self::UnknownTenant(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict { .. } => 409,
            Self::InvalidConfiguration { .. } => 422,
            Self::ConfigurationFault { .. } | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::UnknownTenant(_) => "unknown_tenant",
            Self::Validation(_) => "validation_error",
            Self::PolicyDenied { reason, .. }
            | Self::Conflict { reason, .. }
            | Self::InvalidConfiguration { reason, .. }
            | Self::ConfigurationFault { reason, .. } => reason,
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns true for errors whose details must not leak to clients.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied(reason: &'static str) -> AppError {
        AppError::PolicyDenied {
            reason,
            message: "denied".into(),
        }
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::Unauthorized(String::new()).status_code(), 401);
        assert_eq!(AppError::Forbidden(String::new()).status_code(), 403);
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::UnknownTenant(Uuid::nil()).status_code(), 404);
        assert_eq!(AppError::Validation(String::new()).status_code(), 400);
        assert_eq!(denied("quota_exceeded").status_code(), 403);
        assert_eq!(
            AppError::Conflict {
                reason: "already_used_promo",
                message: String::new()
            }
            .status_code(),
            409
        );
        assert_eq!(
            AppError::InvalidConfiguration {
                reason: "invalid_bracket_config",
                message: String::new()
            }
            .status_code(),
            422
        );
        assert_eq!(
            AppError::ConfigurationFault {
                reason: "invalid_bracket_config",
                message: String::new()
            }
            .status_code(),
            500
        );
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_policy_reasons_are_surfaced_verbatim() {
        assert_eq!(denied("quota_exceeded").error_code(), "quota_exceeded");
        assert_eq!(denied("feature_denied").error_code(), "feature_denied");
        assert_eq!(
            denied("sync_limit_exceeded").error_code(),
            "sync_limit_exceeded"
        );
        assert_eq!(
            AppError::UnknownTenant(Uuid::nil()).error_code(),
            "unknown_tenant"
        );
        assert_eq!(
            AppError::Validation(String::new()).error_code(),
            "validation_error"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Unauthorized("msg".into()).to_string(),
            "Authentication failed: msg"
        );
        assert_eq!(denied("quota_exceeded").to_string(), "denied");
        assert_eq!(
            AppError::InvalidConfiguration {
                reason: "invalid_catalog",
                message: "free tier must be priced 0".into()
            }
            .to_string(),
            "Invalid configuration: free tier must be priced 0"
        );
    }

    #[test]
    fn test_server_errors_flagged() {
        assert!(AppError::Internal(String::new()).is_server_error());
        assert!(!denied("quota_exceeded").is_server_error());
    }
}
