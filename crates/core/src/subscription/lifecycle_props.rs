//! Property-based tests for billing event application.

use chrono::{DateTime, Duration, TimeZone, Utc};
use monetrax_shared::types::TenantId;
use proptest::prelude::*;

use super::lifecycle::{BillingEventKind, SubscriptionLifecycle, Transition};
use super::types::{BillingCycle, Subscription, Tier};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::Free),
        Just(Tier::Starter),
        Just(Tier::Business),
        Just(Tier::Enterprise),
    ]
}

/// Events with period offsets in days from a fixed base, in any order.
fn event_strategy() -> impl Strategy<Value = BillingEventKind> {
    prop_oneof![
        (tier_strategy(), 0i64..400, 1i64..40).prop_map(|(tier, start, len)| {
            BillingEventKind::CheckoutCompleted {
                tier,
                billing_cycle: BillingCycle::Monthly,
                period_start: base() + Duration::days(start),
                period_end: base() + Duration::days(start + len),
            }
        }),
        (0i64..400, 1i64..40).prop_map(|(start, len)| BillingEventKind::Renewed {
            period_start: base() + Duration::days(start),
            period_end: base() + Duration::days(start + len),
        }),
        Just(BillingEventKind::CancellationRequested),
        (0i64..400).prop_map(|at| BillingEventKind::CancellationEffective {
            effective_at: base() + Duration::days(at),
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Once a tenant has paid, no sequence of events clears the flag.
    #[test]
    fn prop_had_paid_subscription_is_monotonic(
        events in prop::collection::vec(event_strategy(), 1..30),
    ) {
        let mut current = Subscription::free(TenantId::new(), base());
        let mut ever_paid = false;

        for event in &events {
            if let Ok(transition) = SubscriptionLifecycle::apply(&current, event) {
                if let Some(next) = transition.subscription() {
                    current = next.clone();
                }
            }
            if ever_paid {
                prop_assert!(current.had_paid_subscription);
            }
            ever_paid |= current.had_paid_subscription;
        }
    }

    /// Free records never carry a period end; paid records always do.
    #[test]
    fn prop_free_tier_has_no_period_end(
        events in prop::collection::vec(event_strategy(), 1..30),
    ) {
        let mut current = Subscription::free(TenantId::new(), base());
        for event in &events {
            if let Ok(transition) = SubscriptionLifecycle::apply(&current, event) {
                if let Some(next) = transition.subscription() {
                    current = next.clone();
                }
            }
            prop_assert_eq!(current.tier == Tier::Free, current.current_period_end.is_none());
        }
    }

    /// Redelivering an event that already applied is a no-op.
    #[test]
    fn prop_replayed_period_event_is_stale(event in event_strategy()) {
        let current = Subscription {
            tier: Tier::Starter,
            current_period_end: Some(base() + Duration::days(30)),
            had_paid_subscription: true,
            ..Subscription::free(TenantId::new(), base())
        };
        if let Ok(Transition::Updated(next) | Transition::Replaced(next)) =
            SubscriptionLifecycle::apply(&current, &event)
        {
            prop_assert_eq!(
                SubscriptionLifecycle::apply(&next, &event),
                Ok(Transition::Stale)
            );
        }
    }
}
