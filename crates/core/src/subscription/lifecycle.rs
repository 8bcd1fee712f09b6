//! Billing event application.
//!
//! Events arrive from the payment provider possibly duplicated and out of
//! order. Duplicates are filtered by event id in storage; this module
//! decides what a single event does to the current subscription, treating
//! anything that would move the billing period backwards as stale.

use chrono::{DateTime, Utc};
use monetrax_shared::types::{SubscriptionId, TenantId};
use serde::{Deserialize, Serialize};

use super::error::LifecycleError;
use super::types::{BillingCycle, Subscription, SubscriptionStatus, Tier};

/// A billing event from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Provider-assigned unique id; replays carry the same id.
    pub event_id: String,
    /// Tenant the event concerns.
    pub tenant_id: TenantId,
    /// When the provider emitted the event.
    pub occurred_at: DateTime<Utc>,
    /// Event payload.
    #[serde(flatten)]
    pub kind: BillingEventKind,
}

/// Payload of a billing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingEventKind {
    /// A paid checkout completed.
    CheckoutCompleted {
        /// Purchased tier.
        tier: Tier,
        /// Purchased cycle.
        billing_cycle: BillingCycle,
        /// Start of the paid period.
        period_start: DateTime<Utc>,
        /// End of the paid period.
        period_end: DateTime<Utc>,
    },
    /// The subscription renewed for another period.
    Renewed {
        /// Start of the new period.
        period_start: DateTime<Utc>,
        /// End of the new period.
        period_end: DateTime<Utc>,
    },
    /// The tenant asked to cancel at period end.
    CancellationRequested,
    /// The paid period ended after a cancellation request.
    CancellationEffective {
        /// When the downgrade takes effect.
        effective_at: DateTime<Utc>,
    },
}

impl BillingEventKind {
    /// Event type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted { .. } => "checkout_completed",
            Self::Renewed { .. } => "renewed",
            Self::CancellationRequested => "cancellation_requested",
            Self::CancellationEffective { .. } => "cancellation_effective",
        }
    }
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The current record changes in place.
    Updated(Subscription),
    /// The current record is closed and a new one takes over.
    Replaced(Subscription),
    /// The event is out of date and changes nothing.
    Stale,
}

impl Transition {
    /// The new state, if any.
    #[must_use]
    pub const fn subscription(&self) -> Option<&Subscription> {
        match self {
            Self::Updated(sub) | Self::Replaced(sub) => Some(sub),
            Self::Stale => None,
        }
    }
}

/// Subscription state machine.
pub struct SubscriptionLifecycle;

impl SubscriptionLifecycle {
    /// Applies one event to the tenant's current subscription.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError` for events that can never apply, such as a
    /// free-tier checkout, or cancelling or renewing a tenant that has never
    /// paid. The same events for a tenant whose paid period already closed
    /// arrived late and are stale.
    pub fn apply(
        current: &Subscription,
        event: &BillingEventKind,
    ) -> Result<Transition, LifecycleError> {
        match *event {
            BillingEventKind::CheckoutCompleted {
                tier,
                billing_cycle,
                period_start,
                period_end,
            } => {
                if tier == Tier::Free {
                    return Err(LifecycleError::FreeCheckout);
                }
                if period_end <= period_start {
                    return Err(LifecycleError::InvalidPeriod);
                }
                // A free record has no paid period to protect; only a
                // purchase that already lapsed before it is stale.
                if current.effective_tier() == Tier::Free {
                    if period_end <= current.current_period_start {
                        return Ok(Transition::Stale);
                    }
                } else if period_start < current.current_period_start {
                    return Ok(Transition::Stale);
                } else if period_start == current.current_period_start {
                    // Same billing anchor: a plan change inside the running
                    // period, or a replay of the purchase that opened it.
                    if tier == current.tier && billing_cycle == current.billing_cycle {
                        return Ok(Transition::Stale);
                    }
                    return Ok(Transition::Updated(Subscription {
                        tier,
                        billing_cycle,
                        status: SubscriptionStatus::Active,
                        current_period_end: Some(period_end),
                        had_paid_subscription: true,
                        promo_price: None,
                        ..current.clone()
                    }));
                }
                Ok(Transition::Replaced(Subscription {
                    id: SubscriptionId::new(),
                    tenant_id: current.tenant_id,
                    tier,
                    billing_cycle,
                    status: SubscriptionStatus::Active,
                    current_period_start: period_start,
                    current_period_end: Some(period_end),
                    had_paid_subscription: true,
                    promo_price: None,
                }))
            }

            BillingEventKind::Renewed {
                period_start,
                period_end,
            } => {
                if current.effective_tier() == Tier::Free {
                    // Renewal of a period that has since been closed.
                    if current.had_paid_subscription {
                        return Ok(Transition::Stale);
                    }
                    return Err(LifecycleError::NothingToRenew);
                }
                if period_end <= period_start {
                    return Err(LifecycleError::InvalidPeriod);
                }
                if period_start <= current.current_period_start {
                    return Ok(Transition::Stale);
                }
                Ok(Transition::Updated(Subscription {
                    status: SubscriptionStatus::Active,
                    current_period_start: period_start,
                    current_period_end: Some(period_end),
                    promo_price: None,
                    ..current.clone()
                }))
            }

            BillingEventKind::CancellationRequested => {
                if current.effective_tier() == Tier::Free {
                    if current.had_paid_subscription {
                        return Ok(Transition::Stale);
                    }
                    return Err(LifecycleError::NothingToCancel);
                }
                if current.status == SubscriptionStatus::Cancelling {
                    return Ok(Transition::Stale);
                }
                Ok(Transition::Updated(Subscription {
                    status: SubscriptionStatus::Cancelling,
                    ..current.clone()
                }))
            }

            BillingEventKind::CancellationEffective { effective_at } => {
                if current.effective_tier() == Tier::Free
                    || effective_at < current.current_period_start
                {
                    return Ok(Transition::Stale);
                }
                // Without a pending request only the end of the paid period
                // can close it.
                let period_over = current
                    .current_period_end
                    .is_some_and(|end| effective_at >= end);
                if current.status != SubscriptionStatus::Cancelling && !period_over {
                    return Ok(Transition::Stale);
                }
                Ok(Transition::Replaced(Subscription {
                    id: SubscriptionId::new(),
                    tenant_id: current.tenant_id,
                    tier: Tier::Free,
                    billing_cycle: BillingCycle::Monthly,
                    status: SubscriptionStatus::Active,
                    current_period_start: effective_at,
                    current_period_end: None,
                    had_paid_subscription: current.had_paid_subscription,
                    promo_price: None,
                }))
            }
        }
    }
}
