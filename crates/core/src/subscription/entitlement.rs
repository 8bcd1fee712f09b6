//! Entitlement checks: can a tenant perform an action right now?
//!
//! The gate is a pure function of a tenant snapshot and the catalog. The
//! storage layer re-applies the same limit inside an atomic conditional
//! update, so a stale snapshot can never overshoot a quota.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::SubscriptionCatalog;
use super::error::SubscriptionError;
use super::types::{Feature, Limit, PlanFeatures, Subscription, Tier};
use super::usage::{UsageCounter, UsageTracker};

/// An action subject to entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Record a transaction (manual entry or ingestion).
    CreateTransaction,
    /// Use a plan feature.
    UseFeature(Feature),
    /// Trigger a manual bank sync.
    ManualBankSync,
    /// Link another bank account.
    LinkBankAccount,
}

/// Why an action was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// A count quota is used up.
    QuotaExceeded,
    /// The tier does not include the feature.
    FeatureDenied,
    /// The daily manual sync allowance is used up.
    SyncLimitExceeded,
}

impl DenialReason {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::FeatureDenied => "feature_denied",
            Self::SyncLimitExceeded => "sync_limit_exceeded",
        }
    }

    /// Human-readable explanation.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "Your plan's limit has been reached. Upgrade to continue.",
            Self::FeatureDenied => "This feature is not included in your current plan.",
            Self::SyncLimitExceeded => "Daily manual sync limit reached. Try again tomorrow.",
        }
    }
}

/// Outcome of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allowed,
    /// The action is refused.
    Denied(DenialReason),
}

impl Decision {
    /// Returns true for `Allowed`.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    fn from_limit(limit: Limit, used: u32, reason: DenialReason) -> Self {
        if limit.allows(used) {
            Self::Allowed
        } else {
            Self::Denied(reason)
        }
    }
}

/// Everything the gate needs to know about a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantState {
    /// Current subscription.
    pub subscription: Subscription,
    /// Usage counter for the current quota period.
    pub usage: UsageCounter,
    /// Bank accounts currently linked.
    pub linked_bank_accounts: u32,
}

/// Evaluates actions against the catalog.
pub struct EntitlementGate<'a> {
    catalog: &'a SubscriptionCatalog,
}

impl<'a> EntitlementGate<'a> {
    /// Creates a gate over a validated catalog.
    #[must_use]
    pub const fn new(catalog: &'a SubscriptionCatalog) -> Self {
        Self { catalog }
    }

    /// Decides whether `action` is allowed for the tenant at `now`.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::TierNotInCatalog` when the tenant's tier
    /// has no plan; the caller must treat this as a refusal.
    pub fn check(
        &self,
        state: &TenantState,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<Decision, SubscriptionError> {
        let features = self.features_for(&state.subscription)?;

        let decision = match action {
            Action::CreateTransaction => {
                let period_start = UsageTracker::quota_period_start(&state.subscription, now);
                let used = UsageTracker::transactions_used(&state.usage, period_start);
                Decision::from_limit(
                    features.transactions_per_month,
                    used,
                    DenialReason::QuotaExceeded,
                )
            }
            Action::UseFeature(feature) => {
                if features.gate(feature).allows() {
                    Decision::Allowed
                } else {
                    Decision::Denied(DenialReason::FeatureDenied)
                }
            }
            Action::ManualBankSync => Decision::from_limit(
                features.manual_syncs_per_day,
                state.usage.syncs_on(now.date_naive()),
                DenialReason::SyncLimitExceeded,
            ),
            Action::LinkBankAccount => Decision::from_limit(
                features.bank_accounts_max,
                state.linked_bank_accounts,
                DenialReason::QuotaExceeded,
            ),
        };
        Ok(decision)
    }

    /// Feature table for the subscription's effective tier.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::TierNotInCatalog` if the tier has no plan.
    pub fn features_for(
        &self,
        subscription: &Subscription,
    ) -> Result<&'a PlanFeatures, SubscriptionError> {
        Ok(&self.catalog.plan(subscription.effective_tier())?.features)
    }

    /// The tier a tenant on `current` would need to gain `feature`, if an
    /// upgrade would help at all.
    #[must_use]
    pub fn upgrade_target(&self, current: Tier, feature: Feature) -> Option<Tier> {
        self.catalog
            .lowest_tier_with(feature)
            .filter(|tier| *tier > current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::catalog::fixtures::standard_catalog;
    use crate::subscription::types::{SubscriptionStatus, Tier};
    use chrono::{NaiveDate, TimeZone};
    use monetrax_shared::types::TenantId;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap()
    }

    fn free_state(transactions_used: u32) -> TenantState {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let subscription = Subscription::free(TenantId::new(), start);
        let mut usage = UsageCounter::fresh(subscription.tenant_id, start);
        usage.transactions_used = transactions_used;
        TenantState {
            subscription,
            usage,
            linked_bank_accounts: 0,
        }
    }

    #[test]
    fn test_free_quota_exhausted_then_upgrade_allows_without_reset() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);

        let mut state = free_state(50);
        assert_eq!(
            gate.check(&state, Action::CreateTransaction, now()).unwrap(),
            Decision::Denied(DenialReason::QuotaExceeded)
        );

        // Upgrade within the same period; the counter is untouched.
        state.subscription.tier = Tier::Starter;
        state.subscription.current_period_end =
            Some(Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap());
        assert_eq!(
            gate.check(&state, Action::CreateTransaction, now()).unwrap(),
            Decision::Allowed
        );
        assert_eq!(state.usage.transactions_used, 50);
    }

    #[test]
    fn test_new_period_counter_reads_zero() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        let state = free_state(50);
        let next_month = Utc.with_ymd_and_hms(2026, 2, 16, 0, 0, 0).unwrap();
        assert!(
            gate.check(&state, Action::CreateTransaction, next_month)
                .unwrap()
                .is_allowed()
        );
    }

    #[test]
    fn test_feature_denied_on_free() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        let state = free_state(0);
        assert_eq!(
            gate.check(&state, Action::UseFeature(Feature::AiInsights), now())
                .unwrap(),
            Decision::Denied(DenialReason::FeatureDenied)
        );
        // Quota-typed feature with a positive limit counts as available.
        assert!(
            gate.check(&state, Action::UseFeature(Feature::TransactionsPerMonth), now())
                .unwrap()
                .is_allowed()
        );
        // A zero quota does not.
        assert!(
            !gate
                .check(&state, Action::UseFeature(Feature::BankAccountsMax), now())
                .unwrap()
                .is_allowed()
        );
    }

    #[test]
    fn test_manual_sync_limit_per_day() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        let mut state = free_state(0);
        state.subscription.tier = Tier::Starter;
        state.subscription.current_period_end =
            Some(Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap());
        state.usage.manual_syncs_used_today = 3;
        state.usage.sync_day = NaiveDate::from_ymd_opt(2026, 1, 20);

        assert_eq!(
            gate.check(&state, Action::ManualBankSync, now()).unwrap(),
            Decision::Denied(DenialReason::SyncLimitExceeded)
        );

        let tomorrow = Utc.with_ymd_and_hms(2026, 1, 21, 0, 0, 1).unwrap();
        assert!(gate.check(&state, Action::ManualBankSync, tomorrow).unwrap().is_allowed());
    }

    #[test]
    fn test_link_bank_account_quota() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        let mut state = free_state(0);
        state.subscription.tier = Tier::Business;
        state.subscription.current_period_end =
            Some(Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap());
        state.linked_bank_accounts = 2;
        assert!(gate.check(&state, Action::LinkBankAccount, now()).unwrap().is_allowed());
        state.linked_bank_accounts = 3;
        assert_eq!(
            gate.check(&state, Action::LinkBankAccount, now()).unwrap(),
            Decision::Denied(DenialReason::QuotaExceeded)
        );
    }

    #[test]
    fn test_cancelled_record_gets_free_entitlements() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        let mut state = free_state(0);
        state.subscription.tier = Tier::Enterprise;
        state.subscription.status = SubscriptionStatus::Cancelled;
        assert_eq!(
            gate.check(&state, Action::UseFeature(Feature::MultiUser), now())
                .unwrap(),
            Decision::Denied(DenialReason::FeatureDenied)
        );
    }

    #[test]
    fn test_upgrade_target() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        assert_eq!(
            gate.upgrade_target(Tier::Free, Feature::AiInsights),
            Some(Tier::Business)
        );
        assert_eq!(gate.upgrade_target(Tier::Enterprise, Feature::AiInsights), None);
    }

    #[test]
    fn test_determinism() {
        let catalog = standard_catalog();
        let gate = EntitlementGate::new(&catalog);
        let state = free_state(49);
        let first = gate.check(&state, Action::CreateTransaction, now()).unwrap();
        let second = gate.check(&state, Action::CreateTransaction, now()).unwrap();
        assert_eq!(first, second);
        assert!(first.is_allowed());
    }
}
