//! Subscription tiers and entitlements.
//!
//! - Catalog of plans with tier-feature consistency checks
//! - Usage counters and quota periods
//! - Entitlement gate for transactions, features and bank access
//! - Agent-issued promotional signups
//! - Billing event lifecycle

pub mod catalog;
pub mod entitlement;
pub mod error;
pub mod lifecycle;
pub mod promo;
pub mod types;
pub mod usage;

#[cfg(test)]
mod lifecycle_props;

pub use catalog::SubscriptionCatalog;
pub use entitlement::{Action, Decision, DenialReason, EntitlementGate, TenantState};
pub use error::{LifecycleError, PromoError, SubscriptionError};
pub use lifecycle::{BillingEvent, BillingEventKind, SubscriptionLifecycle, Transition};
pub use promo::{
    AgentTag, IdentifierKind, PromoHistory, PromoIdentifier, PromoIssuance, PromoQuote,
    PromoRequest, PromoSignup, PromotionalPricingService,
};
pub use types::{
    BillingCycle, Feature, FeatureGate, Limit, PlanFeatures, Subscription, SubscriptionPlan,
    SubscriptionStatus, SyncFrequency, Tier,
};
pub use usage::{UsageCounter, UsageReport, UsageTracker};
