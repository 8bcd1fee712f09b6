//! Subscription, promotion and lifecycle error types.

use thiserror::Error;

use super::types::Tier;

/// Catalog and entitlement errors.
///
/// These are configuration faults: the action is refused rather than
/// evaluated against a broken catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The catalog failed validation.
    #[error("Invalid subscription catalog: {0}")]
    InvalidCatalog(String),

    /// A tenant's tier has no plan in the catalog.
    #[error("Tier {0} is missing from the subscription catalog")]
    TierNotInCatalog(Tier),
}

impl SubscriptionError {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        "invalid_catalog"
    }
}

/// Promotional signup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoError {
    /// Identifier is neither a valid email nor a valid phone number.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Agent initials are malformed.
    #[error("Invalid agent tag: {0}")]
    InvalidAgentTag(String),

    /// The tier has no promotional price.
    #[error("Tier {0} has no promotional price")]
    TierNotPromotable(Tier),

    /// The identifier already received a promotion, or the tenant already paid.
    #[error("This identifier has already used a promotional offer")]
    AlreadyUsedPromo,

    /// Catalog fault.
    #[error(transparent)]
    Catalog(#[from] SubscriptionError),
}

impl PromoError {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) | Self::InvalidAgentTag(_) | Self::TierNotPromotable(_) => {
                "validation_error"
            }
            Self::AlreadyUsedPromo => "already_used_promo",
            Self::Catalog(e) => e.reason(),
        }
    }
}

/// Billing event application errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Checkout for the free tier makes no sense.
    #[error("Checkout cannot target the free tier")]
    FreeCheckout,

    /// The event's period end does not follow its start.
    #[error("Billing period end must be after its start")]
    InvalidPeriod,

    /// Cancellation requested on a free subscription.
    #[error("There is no paid subscription to cancel")]
    NothingToCancel,

    /// Renewal received for a free subscription.
    #[error("There is no paid subscription to renew")]
    NothingToRenew,
}

impl LifecycleError {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::FreeCheckout | Self::InvalidPeriod => "validation_error",
            Self::NothingToCancel => "nothing_to_cancel",
            Self::NothingToRenew => "nothing_to_renew",
        }
    }
}
